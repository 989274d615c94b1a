pub mod regulation;
pub mod schema;
pub mod session;

pub use regulation::RegulationPrediction;
pub use schema::columns;
pub use session::{SessionDateError, SessionRecord, parse_session_date};
