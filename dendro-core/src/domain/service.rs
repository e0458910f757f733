//! Service domain types and authorization predicates

use serde::{Deserialize, Serialize};

/// A named queue of jobs with an owner and a member list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub service_name: String,
    pub user_id: String,
    #[serde(default)]
    pub users: Vec<ServiceUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUser {
    pub user_id: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub create_jobs: bool,
    #[serde(default)]
    pub process_jobs: bool,
}

impl Service {
    fn member(&self, user_id: &str) -> Option<&ServiceUser> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    fn is_owner(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn user_is_admin(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.member(user_id).is_some_and(|u| u.admin)
    }

    pub fn user_is_allowed_to_create_jobs(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.member(user_id).is_some_and(|u| u.create_jobs)
    }

    pub fn user_is_allowed_to_process_jobs(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.member(user_id).is_some_and(|u| u.process_jobs)
    }

    pub fn user_is_allowed_to_delete_jobs(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.member(user_id).is_some_and(|u| u.create_jobs || u.admin)
    }
}
