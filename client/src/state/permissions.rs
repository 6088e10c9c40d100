//! Role-derived capability flags consumed by feature views.

#[cfg(test)]
#[path = "permissions_test.rs"]
mod permissions_test;

use serde::Serialize;

use crate::net::types::Role;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Permissions {
    pub manage_users: bool,
    pub view_reports: bool,
    pub manage_labs: bool,
    pub manage_equipment: bool,
    pub manage_maintenance: bool,
    /// Approve or reject pending booking requests.
    pub review_bookings: bool,
    pub create_bookings: bool,
    /// New bookings skip the approval queue.
    pub bookings_auto_approved: bool,
    pub delete_bookings: bool,
    /// See every booking rather than only one's own.
    pub view_all_bookings: bool,
}

impl Permissions {
    /// No capabilities; the signed-out state.
    pub const NONE: Self = Self {
        manage_users: false,
        view_reports: false,
        manage_labs: false,
        manage_equipment: false,
        manage_maintenance: false,
        review_bookings: false,
        create_bookings: false,
        bookings_auto_approved: false,
        delete_bookings: false,
        view_all_bookings: false,
    };

    #[must_use]
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self {
                manage_users: true,
                view_reports: true,
                manage_labs: true,
                manage_equipment: true,
                manage_maintenance: true,
                delete_bookings: true,
                view_all_bookings: true,
                ..Self::NONE
            },
            Role::LabManager => Self {
                manage_equipment: true,
                manage_maintenance: true,
                review_bookings: true,
                view_all_bookings: true,
                ..Self::NONE
            },
            Role::Instructor => Self { create_bookings: true, bookings_auto_approved: true, ..Self::NONE },
            Role::Student => Self { create_bookings: true, ..Self::NONE },
        }
    }

    /// `NONE` when signed out.
    #[must_use]
    pub fn for_session(role: Option<Role>) -> Self {
        role.map_or(Self::NONE, Self::for_role)
    }
}
