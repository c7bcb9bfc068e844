//! JSON-RPC 2.0 bridge to the host web page.
//!
//! The editor runs inside an iframe. The host page drives it entirely through
//! postMessage: it switches modes, confirms picks with a label, saves and
//! deletes, and listens for notifications describing what changed.
//!
//! ## Message Flow
//!
//! ```text
//! Host page (parent window)  <──postMessage──>  Bevy (iframe)
//!        │                                        │
//!        ├─ Request (with ID) ──────────────────> │
//!        │                                        ├─ Process request
//!        │ <───────────────── Response (with ID) ─┤
//!        │                                        │
//!        │ <────────── Notification (no ID) ─────┤
//! ```
//!
//! Editor inputs are applied while the request is handled, so their response
//! already carries the resulting state. Environment commands are acknowledged
//! once queued; their outcome arrives as notifications. Dashboard, environment
//! list and marking detail requests are answered when the gateway call returns.
//!
//! ## Methods
//!
//! ### Editing
//! - `set_mode`: `view-only`, `add-marking`, `translate`, `rotate`, `scale`, `pick-origin`
//! - `confirm_pick`, `cancel_pick`, `cancel`, `select_scan`
//! - `set_editable`, `save_environment`
//!
//! ### Markings and origin
//! - `save_markings`, `resume_save`, `cancel_save`
//! - `delete_marking`, `retry_delete`
//! - `save_origin`, `clear_origin`, `get_qr_payload`
//!
//! ### Environment
//! - `load_environment`, `delete_environment`, `delete_scan`
//!
//! ### Queries
//! - `get_editor_state`, `get_markings`, `get_origin`, `get_scans`
//! - `get_dashboard`, `list_environments`, `get_marking` (deferred)
//!
//! ## Notifications
//!
//! `editor_state_changed`, `pending_pick`, `markings_changed`, `origin_changed`,
//! `scan_state_changed`, `environment_loaded`, `environment_load_failed`,
//! `save_progress`, `notice`.
//!
//! ## Error Handling
//!
//! Standard JSON-RPC 2.0 error codes:
//! - `-32600`: Invalid request, including inputs the editor refuses in its current state
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error, including gateway failures

/// Responses held back until their gateway call completes.
pub mod deferred;

/// Change-driven notifications to the host page.
pub mod notifications;

/// Transport, request dispatch and the RPC plugin.
pub mod web_rpc;
