// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{BridgeError, BridgeResult};
use std::{collections::HashSet, sync::Mutex};
use strum_macros::{Display, EnumIter};

/// Capabilities a caller of [`PhoneInterface`] may need.
///
/// [`PhoneInterface`]: super::PhoneInterface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Permission {
    #[strum(serialize = "READ_PHONE_STATE")]
    ReadPhoneState,
    #[strum(serialize = "MODIFY_PHONE_STATE")]
    ModifyPhoneState,
    #[strum(serialize = "CALL_PHONE")]
    CallPhone,
    #[strum(serialize = "ACCESS_FINE_LOCATION")]
    AccessFineLocation,
    #[strum(serialize = "ACCESS_COARSE_LOCATION")]
    AccessCoarseLocation,
}

/// The authorization collaborator. Decides whether the current caller holds a
/// [`Permission`].
pub trait PermissionChecker: Send + Sync {
    /// # Errors
    ///
    /// [`BridgeError::PermissionDenied`] if the caller lacks `permission`.
    fn enforce(&self, permission: Permission) -> BridgeResult<()>;
}

/// Location access: fine location is enough on its own. Otherwise coarse location
/// is checked, and its denial is the one reported since it is the weaker
/// precondition.
///
/// # Errors
///
/// [`BridgeError::PermissionDenied`] naming [`Permission::AccessCoarseLocation`].
pub fn enforce_location(checker: &dyn PermissionChecker) -> BridgeResult<()> {
    match checker.enforce(Permission::AccessFineLocation) {
        Ok(()) => Ok(()),
        Err(_) => checker.enforce(Permission::AccessCoarseLocation),
    }
}

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn enforce(&self, _permission: Permission) -> BridgeResult<()> { Ok(()) }
}

/// Denies a configured set of permissions and records every check, in order.
#[derive(Debug, Default)]
pub struct RecordingChecker {
    denied: HashSet<Permission>,
    checks: Mutex<Vec<Permission>>,
}

impl RecordingChecker {
    #[must_use]
    pub fn denying(denied: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
            checks: Mutex::new(vec![]),
        }
    }

    /// Every permission checked so far.
    #[must_use]
    pub fn checks(&self) -> Vec<Permission> {
        match self.checks.lock() {
            Ok(checks) => checks.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PermissionChecker for RecordingChecker {
    fn enforce(&self, permission: Permission) -> BridgeResult<()> {
        match self.checks.lock() {
            Ok(mut checks) => checks.push(permission),
            Err(poisoned) => poisoned.into_inner().push(permission),
        }
        if self.denied.contains(&permission) {
            tracing::warn!(%permission, "permission denied");
            return Err(BridgeError::PermissionDenied {
                permission: permission.to_string(),
            });
        }
        Ok(())
    }
}
