pub mod prelude;

pub mod access_logs;
pub mod audio_records;
pub mod financial_data;
pub mod users;
