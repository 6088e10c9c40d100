//! Application views, their paths, and who may see them.
//!
//! SYSTEM CONTEXT
//! ==============
//! This is the client's route table. The guard in `util::auth` consults
//! `Route::access` to decide whether a navigation renders or redirects, and
//! the per-role dashboards link only to views the role can open.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use std::fmt;

use crate::net::types::Role;

/// Who may open a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Register,
    Dashboard,
    Labs,
    Equipment,
    Bookings,
    Maintenance,
    Users,
    Reports,
}

/// Where unauthenticated navigation is sent.
pub const LOGIN_ROUTE: Route = Route::Login;
/// Where a successful sign-in and under-privileged navigation land.
pub const HOME_ROUTE: Route = Route::Dashboard;
/// Where sign-out and unknown paths land.
pub const LANDING_ROUTE: Route = Route::Landing;

impl Route {
    pub const ALL: [Route; 10] = [
        Route::Landing,
        Route::Login,
        Route::Register,
        Route::Dashboard,
        Route::Labs,
        Route::Equipment,
        Route::Bookings,
        Route::Maintenance,
        Route::Users,
        Route::Reports,
    ];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
            Self::Labs => "/labs",
            Self::Equipment => "/equipment",
            Self::Bookings => "/bookings",
            Self::Maintenance => "/maintenance",
            Self::Users => "/admin/users",
            Self::Reports => "/admin/reports",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Landing => "Home",
            Self::Login => "Login",
            Self::Register => "Register",
            Self::Dashboard => "Dashboard",
            Self::Labs => "Labs",
            Self::Equipment => "Equipment",
            Self::Bookings => "Bookings",
            Self::Maintenance => "Maintenance",
            Self::Users => "Users",
            Self::Reports => "Reports",
        }
    }

    #[must_use]
    pub fn access(self) -> Access {
        match self {
            Self::Landing | Self::Login | Self::Register => Access::Public,
            Self::Dashboard | Self::Labs | Self::Equipment | Self::Bookings | Self::Maintenance => {
                Access::Authenticated
            }
            Self::Users | Self::Reports => Access::Role(Role::Admin),
        }
    }

    /// Exact lookup; query strings, fragments and trailing slashes are ignored.
    #[must_use]
    pub fn lookup(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim().trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// =============================================================================
// DASHBOARDS
// =============================================================================

/// Role-specific dashboard heading and the views it links to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dashboard {
    pub title: &'static str,
    pub description: &'static str,
    pub links: &'static [Route],
}

#[must_use]
pub fn dashboard_for(role: Option<Role>) -> Dashboard {
    match role {
        Some(Role::Admin) => Dashboard {
            title: "Admin Dashboard",
            description: "Manage all aspects of the lab management system",
            links: &[Route::Users, Route::Labs, Route::Equipment, Route::Bookings, Route::Maintenance, Route::Reports],
        },
        Some(Role::LabManager) => Dashboard {
            title: "Lab Manager Dashboard",
            description: "Manage your assigned labs and equipment",
            links: &[Route::Labs, Route::Equipment, Route::Bookings, Route::Maintenance],
        },
        Some(Role::Instructor) => Dashboard {
            title: "Instructor Dashboard",
            description: "Book labs and manage your classes",
            links: &[Route::Labs, Route::Bookings, Route::Equipment],
        },
        Some(Role::Student) => Dashboard {
            title: "Student Dashboard",
            description: "Request lab access and view schedules",
            links: &[Route::Labs, Route::Bookings, Route::Equipment],
        },
        None => Dashboard { title: "Dashboard", description: "Welcome to AUCA Lab Management", links: &[] },
    }
}
