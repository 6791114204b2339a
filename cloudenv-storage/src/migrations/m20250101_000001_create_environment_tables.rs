use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Node::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Node::NodeId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Node::Name).string().not_null())
                    .col(
                        ColumnDef::new(Node::Status)
                            .string()
                            .not_null()
                            .default("init"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Task::TaskId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Task::Status)
                            .string()
                            .not_null()
                            .default("init"),
                    )
                    .col(ColumnDef::new(Task::Result).text())
                    .col(ColumnDef::new(Task::Accessed).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Files::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Files::Filename)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Files::TaskId).string().not_null())
                    .col(ColumnDef::new(Files::Ref).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_files_task_id")
                            .from(Files::Table, Files::TaskId)
                            .to(Task::Table, Task::TaskId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_files_task_ref")
                    .table(Files::Table)
                    .col(Files::TaskId)
                    .col(Files::Ref)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_status_accessed")
                    .table(Task::Table)
                    .col(Task::Status)
                    .col(Task::Accessed)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_node_status")
                    .table(Node::Table)
                    .col(Node::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Files::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Task::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Node::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Node {
    Table,
    NodeId,
    Name,
    Status,
}

#[derive(Iden)]
enum Task {
    Table,
    TaskId,
    Status,
    Result,
    Accessed,
}

#[derive(Iden)]
enum Files {
    Table,
    Filename,
    TaskId,
    Ref,
}
