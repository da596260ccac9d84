// Payload inspection: magic-byte sniffing and decode validation.

pub mod image_format;
