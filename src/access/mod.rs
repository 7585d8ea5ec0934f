//! 访问控制：角色矩阵、请求上下文、分支隔离

pub mod branch;
pub mod context;
pub mod policy;

pub use branch::{BranchScoped, find_scoped, resolve_branch_for_create};
pub use context::{RequestContext, ScopeSelection};
pub use policy::{Action, Resource, Role};
