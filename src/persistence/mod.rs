pub mod persist;
pub mod settings;
pub mod table_export;
pub mod xml_codec;
