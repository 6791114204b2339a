use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node lifecycle status
///
/// `Terminated` is never written by the manager; it is derived when the
/// supervisor reports that the process behind a live row has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum NodeStatus {
    #[sea_orm(string_value = "init")]
    Init,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "aborted")]
    Aborted,
    #[sea_orm(string_value = "terminated")]
    Terminated,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

impl NodeStatus {
    /// Whether the row still claims a live process
    pub fn is_live(&self) -> bool {
        matches!(self, NodeStatus::Init | NodeStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Init => "init",
            NodeStatus::Running => "running",
            NodeStatus::Aborted => "aborted",
            NodeStatus::Terminated => "terminated",
            NodeStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisioned worker process
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "node")]
pub struct Model {
    /// Generated identifier, also the parameter namespace of the process
    #[sea_orm(primary_key, auto_increment = false)]
    pub node_id: String,

    /// Caller-chosen node name, not unique
    pub name: String,

    pub status: NodeStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
