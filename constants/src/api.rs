pub const ENVIRONMENTS_PATH: &str = "/api/environments";
pub const UPDATE_SCANS_PATH: &str = "/api/environments/updateScans";
pub const ADD_MARKING_PATH: &str = "/api/environments/addMarking";
pub const DELETE_MARKING_PATH: &str = "/api/environments/deleteMarking";
pub const MARKING_PATH: &str = "/api/environments/markings";
pub const ORIGIN_PATH: &str = "/api/environments/origin";
pub const DELETE_ENVIRONMENT_PATH: &str = "/api/environments/delete";
pub const DELETE_SCAN_PATH: &str = "/api/scans/delete";
pub const DASHBOARD_PATH: &str = "/api/environments/dashboard/getData";

/// Prefix that marks a client-generated marking identity.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Label used when the server returns a marking without a remark.
pub const UNNAMED_MARKING_LABEL: &str = "Unnamed Marking";
