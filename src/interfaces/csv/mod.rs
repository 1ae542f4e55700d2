pub mod balance_writer;
pub mod command_reader;
