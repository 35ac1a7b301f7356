pub mod field_as_string;
pub mod string_or_number;
