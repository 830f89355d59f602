/// Camera authorization as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user hasn't been asked yet
    NotDetermined,
    /// Blocked by policy (parental controls, MDM)
    Restricted,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// What the host UI should do after a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionAction {
    /// Prompt the user, then report back via `on_access_requested`
    RequestAccess,
    /// Explain that camera access is needed in settings
    ShowPermissionAlert,
    Proceed,
}

impl PermissionStatus {
    pub fn action(&self) -> PermissionAction {
        match self {
            PermissionStatus::NotDetermined => PermissionAction::RequestAccess,
            PermissionStatus::Denied | PermissionStatus::Restricted => {
                PermissionAction::ShowPermissionAlert
            }
            PermissionStatus::Granted => PermissionAction::Proceed,
        }
    }
}
