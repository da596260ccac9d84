// Image source abstraction: pluggable providers for the batch prefetcher.

pub mod http_source;
pub mod traits;
