use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// Timestamps use the same text layout as `store::TIMESTAMP_FORMAT` so that
// cutoffs compare lexicographically.
const CREATE_TASK_INSERT_TRIGGER: &str = "
CREATE TRIGGER IF NOT EXISTS task_insert AFTER INSERT ON task
BEGIN
    UPDATE task SET accessed = strftime('%Y-%m-%d %H:%M:%f', 'now')
    WHERE task_id = NEW.task_id;
END";

// Only status/result changes count as access, and a soft-deleted task keeps
// the timestamp it was deleted with.
const CREATE_TASK_UPDATE_TRIGGER: &str = "
CREATE TRIGGER IF NOT EXISTS task_update AFTER UPDATE OF status, result ON task
WHEN OLD.status != 'deleted'
BEGIN
    UPDATE task SET accessed = strftime('%Y-%m-%d %H:%M:%f', 'now')
    WHERE task_id = NEW.task_id;
END";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(CREATE_TASK_INSERT_TRIGGER).await?;
        db.execute_unprepared(CREATE_TASK_UPDATE_TRIGGER).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TRIGGER IF EXISTS task_update")
            .await?;
        db.execute_unprepared("DROP TRIGGER IF EXISTS task_insert")
            .await?;
        Ok(())
    }
}
