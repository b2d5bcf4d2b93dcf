//! Request and response values exchanged with the host server.
//!
//! The kernel treats these as plain values: requests are read-mostly inputs,
//! responses are mutated by the pipeline and finally emitted through
//! [`ResponseWriter`]. Parsing of wire-level headers and bodies belongs to the
//! host and is not modelled here.

mod method;
mod request;
mod response;
mod status;

pub use self::method::HttpMethod;
pub use self::request::{Request, RequestSource, Uri};
pub use self::response::{Emitted, Response, ResponseWriter};
pub use self::status::StatusCode;

#[cfg(test)]
mod tests;
