use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A result file written for a task
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    /// Absolute path of the file on disk
    #[sea_orm(primary_key, auto_increment = false)]
    pub filename: String,

    pub task_id: String,

    /// Reference the converter put into the result document
    #[sea_orm(column_name = "ref")]
    pub file_ref: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tasks::Entity",
        from = "Column::TaskId",
        to = "super::tasks::Column::TaskId",
        on_delete = "Cascade"
    )]
    Task,
}

impl Related<super::tasks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
