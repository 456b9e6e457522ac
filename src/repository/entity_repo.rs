// ==========================================
// 报表产物存储 - 统一仓储契约
// ==========================================
// 会话 (Connection / Transaction) 由调用方在每次调用时传入,仓储不持有
// save 不提交事务,事务边界由调用方控制
// ==========================================

use crate::repository::error::{EntityKind, RepositoryResult};
use rusqlite::Connection;

pub trait EntityRepository {
    type Entity;

    const KIND: EntityKind;

    /// 按代理主键查询;不存在返回 Ok(None)
    fn get_by_id(&self, conn: &Connection, id: i64) -> RepositoryResult<Option<Self::Entity>>;

    /// 按外部 UUID 查询;不存在返回 Ok(None)
    fn get_by_uuid(&self, conn: &Connection, uuid: &str) -> RepositoryResult<Option<Self::Entity>>;

    /// upsert: 无 id 则插入并分配 id;有 id 则按 id 更新
    fn save(&self, conn: &Connection, entity: Self::Entity) -> RepositoryResult<Self::Entity>;

    /// 物理删除,不可恢复 (退役请改字段后 save)
    fn purge(&self, conn: &Connection, entity: &Self::Entity) -> RepositoryResult<()>;
}
