#![warn(clippy::pedantic)]
// Noisy doc/signature lints — would require annotating hundreds of pub functions
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference — keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// Intentional casts in scoring/size code (digit runs, body sizes)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
// Module structure — phone::PhoneValidation etc. by design
#![allow(clippy::module_name_repetitions)]

pub mod chat_id;
pub mod cli;
pub mod config;
pub(crate) mod errors;
pub mod gateway;
pub mod ingest;
pub mod leads;
pub mod media;
pub mod message;
pub mod phone;
pub mod storage;
pub(crate) mod utils;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
