//! Browser-extension runtime: page context, message relay and side panel as
//! independent tasks that only talk through typed channels.

pub mod auth;
pub mod client;
pub mod clock;
pub mod cookies;
pub mod extractor;
pub mod page;
pub mod panel;
pub mod protocol;
pub mod relay;
pub mod runtime;

pub use auth::{AuthCache, AuthChecker, AuthState, IdentityClient, IdentityOutcome};
pub use client::BackendClient;
pub use cookies::{Cookie, CookieChange, CookieStore, MemoryCookieJar};
pub use extractor::{PageSnapshot, ProblemSnapshot, extract_problem_data};
pub use panel::{PanelContent, PanelController, PanelState, RequestKind, SubmitOptions};
pub use protocol::{Origin, Payload, Request, Response};
pub use runtime::ExtensionRuntime;
