/// Router Module Index
///
/// Routing is split by the access level each group requires, and the access
/// check is attached once per group as a layer in `create_router`.

/// Routes open to anonymous clients: banner, health probe, register and login.
pub mod public;

/// Routes that require a valid bearer token (`AuthUser`).
pub mod authenticated;

/// Routes restricted to the 'admin' role (`AdminUser`), nested under `/admin`.
pub mod admin;
