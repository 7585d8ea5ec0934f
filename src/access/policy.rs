//! 角色权限矩阵

use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Executive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Resource {
    Leads,
    Products,
    Categories,
    Units,
    Vendors,
    Services,
    Targets,
    Teams,
    Branches,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

impl Role {
    /// 开通租户时按此顺序写入 roles 表
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Executive];

    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Full access to every module and branch",
            Role::Manager => "Manages sales, targets and teams; maintains the catalog",
            Role::Executive => "Works assigned leads; read-only elsewhere",
        }
    }

    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        use Action::*;
        use Resource::*;

        match self {
            Role::Admin => true,
            Role::Manager => match resource {
                Leads | Targets | Teams => true,
                Products | Categories | Units | Vendors | Services => action != Delete,
                Branches | Users => action == View,
            },
            Role::Executive => match (resource, action) {
                (Users, _) => false,
                (_, View) => true,
                (Leads, Create | Update) => true,
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOURCES: [Resource; 10] = [
        Resource::Leads,
        Resource::Products,
        Resource::Categories,
        Resource::Units,
        Resource::Vendors,
        Resource::Services,
        Resource::Targets,
        Resource::Teams,
        Resource::Branches,
        Resource::Users,
    ];
    const ACTIONS: [Action; 4] = [Action::View, Action::Create, Action::Update, Action::Delete];

    #[test]
    fn test_admin_allows_everything() {
        for resource in RESOURCES {
            for action in ACTIONS {
                assert!(Role::Admin.allows(resource, action), "{resource} {action}");
            }
        }
    }

    #[test]
    fn test_manager_matrix() {
        let m = Role::Manager;
        assert!(m.allows(Resource::Leads, Action::Delete));
        assert!(m.allows(Resource::Targets, Action::Create));
        assert!(m.allows(Resource::Teams, Action::Delete));
        assert!(m.allows(Resource::Products, Action::Update));
        assert!(!m.allows(Resource::Products, Action::Delete));
        assert!(!m.allows(Resource::Vendors, Action::Delete));
        assert!(m.allows(Resource::Branches, Action::View));
        assert!(!m.allows(Resource::Branches, Action::Create));
        assert!(!m.allows(Resource::Users, Action::Update));
    }

    #[test]
    fn test_executive_matrix() {
        let e = Role::Executive;
        assert!(e.allows(Resource::Leads, Action::Create));
        assert!(e.allows(Resource::Leads, Action::Update));
        assert!(!e.allows(Resource::Leads, Action::Delete));
        assert!(e.allows(Resource::Targets, Action::View));
        assert!(!e.allows(Resource::Targets, Action::Update));
        assert!(!e.allows(Resource::Users, Action::View));
        assert!(!e.allows(Resource::Products, Action::Create));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(Role::Executive.as_ref(), "executive");
        assert!("owner".parse::<Role>().is_err());
    }
}
