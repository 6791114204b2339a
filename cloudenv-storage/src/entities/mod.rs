pub mod files;
pub mod nodes;
pub mod tasks;

pub use files::{
    ActiveModel as FileAttachmentActiveModel, Column as FileAttachmentColumn,
    Entity as FileAttachments, Model as FileAttachment,
};
pub use nodes::{
    ActiveModel as NodeActiveModel, Column as NodeColumn, Entity as Nodes, Model as Node,
    NodeStatus,
};
pub use tasks::{
    ActiveModel as TaskActiveModel, Column as TaskColumn, Entity as Tasks, Model as Task,
    TaskStatus,
};
