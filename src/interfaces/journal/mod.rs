pub mod audit_writer;
pub mod replay;
pub mod request_reader;
