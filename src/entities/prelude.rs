pub use super::access_logs::Entity as AccessLogs;
pub use super::audio_records::Entity as AudioRecords;
pub use super::financial_data::Entity as FinancialData;
pub use super::users::Entity as Users;
