//! Admin side of the catalog: the access gate, the CRUD console and
//! per-session upload handles.

mod console;
mod gate;
mod uploads;

pub use console::AdminConsole;
pub use gate::{AdminError, AdminGate, DEFAULT_ACCESS_CODE, SESSION_STORAGE_KEY};
pub use uploads::{SessionUploads, UPLOAD_URL_PREFIX};
