// ==========================================
// SINAPI 目录同步 - 组合结构数据仓储
// ==========================================
// 存储: assembly_elementary_edge / assembly_subassembly_edge
// 视图: v_assembly_component（两表统一为多态边关系，供递归展开）
// 红线: 当前结构表，无历史；整表替换须在调用方事务内完成
// ==========================================

use crate::domain::{ExplodedComponent, ItemKind, StructureEdge};
use crate::repository::error::RepositoryResult;
use crate::repository::parse_text_column;
use rusqlite::{params, Connection};

/// 递归展开的默认最大深度（防止环形结构无限递归）
pub const DEFAULT_MAX_EXPLOSION_DEPTH: u32 = 32;

pub struct StructureRepository<'a> {
    conn: &'a Connection,
}

impl<'a> StructureRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 经统一视图读取全部结构边
    pub fn load_all(&self) -> RepositoryResult<Vec<StructureEdge>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT parent_code, item_code, item_kind, coefficient
            FROM v_assembly_component
            ORDER BY parent_code, item_kind, item_code
            "#,
        )?;
        let edges = stmt
            .query_map([], |row| {
                Ok(StructureEdge {
                    parent_code: row.get(0)?,
                    child_code: row.get(1)?,
                    child_kind: parse_text_column(row, 2)?,
                    coefficient: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// 清空两张结构边表，返回删除行数
    pub fn clear_all(&self) -> RepositoryResult<usize> {
        let mut deleted = 0;
        for kind in [ItemKind::Elementary, ItemKind::Assembly] {
            deleted += self
                .conn
                .execute(&format!("DELETE FROM {}", kind.edge_table()), [])?;
        }
        Ok(deleted)
    }

    pub fn insert(&self, edge: &StructureEdge) -> RepositoryResult<()> {
        let sql = format!(
            "INSERT INTO {} (parent_code, child_code, coefficient) VALUES (?1, ?2, ?3)",
            edge.child_kind.edge_table()
        );
        self.conn
            .execute(&sql, params![edge.parent_code, edge.child_code, edge.coefficient])?;
        Ok(())
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM v_assembly_component", [], |row| row.get(0))?;
        Ok(n)
    }

    /// 组合展开：递归列出组合的全部下级构成
    ///
    /// # 参数
    /// - code: 根组合编码
    /// - max_depth: 最大递归深度
    ///
    /// # 返回
    /// - 每个下级构成一行，accumulated_coefficient 为自根起的系数连乘
    pub fn explode_assembly(&self, code: i64, max_depth: u32) -> RepositoryResult<Vec<ExplodedComponent>> {
        let mut stmt = self.conn.prepare(
            r#"
            WITH RECURSIVE explosion(parent_code, item_code, item_kind, depth, coefficient, accumulated) AS (
                SELECT parent_code, item_code, item_kind, 1, coefficient, coefficient
                FROM v_assembly_component
                WHERE parent_code = ?1
                UNION ALL
                SELECT c.parent_code, c.item_code, c.item_kind, e.depth + 1,
                       c.coefficient, e.accumulated * c.coefficient
                FROM v_assembly_component c
                JOIN explosion e ON c.parent_code = e.item_code
                WHERE e.item_kind = 'ASSEMBLY' AND e.depth < ?2
            )
            SELECT parent_code, item_code, item_kind, depth, coefficient, accumulated
            FROM explosion
            ORDER BY depth, parent_code, item_kind, item_code
            "#,
        )?;
        let rows = stmt
            .query_map(params![code, max_depth], |row| {
                Ok(ExplodedComponent {
                    parent_code: row.get(0)?,
                    item_code: row.get(1)?,
                    item_kind: parse_text_column(row, 2)?,
                    depth: row.get(3)?,
                    coefficient: row.get(4)?,
                    accumulated_coefficient: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(conn: &Connection) {
        conn.execute_batch(
            r#"
            INSERT INTO elementary_item (code, description) VALUES (10, 'CIMENTO'), (11, 'AREIA');
            INSERT INTO assembly_item (code, description) VALUES (100, 'ARGAMASSA'), (200, 'REBOCO');
            "#,
        )
        .unwrap();
    }

    fn edge(parent: i64, child: i64, kind: ItemKind, coefficient: f64) -> StructureEdge {
        StructureEdge {
            parent_code: parent,
            child_code: child,
            child_kind: kind,
            coefficient,
        }
    }

    #[test]
    fn test_explode_assembly_multiplies_coefficients() {
        let conn = crate::db::open_in_memory().unwrap();
        seed(&conn);
        let repo = StructureRepository::new(&conn);
        repo.insert(&edge(100, 10, ItemKind::Elementary, 0.5)).unwrap();
        repo.insert(&edge(100, 11, ItemKind::Elementary, 2.0)).unwrap();
        repo.insert(&edge(200, 100, ItemKind::Assembly, 0.1)).unwrap();

        let rows = repo.explode_assembly(200, DEFAULT_MAX_EXPLOSION_DEPTH).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].item_code, 100);
        assert_eq!(rows[0].depth, 1);

        let cement = rows.iter().find(|r| r.item_code == 10).unwrap();
        assert_eq!(cement.depth, 2);
        assert!((cement.accumulated_coefficient - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_clear_all_empties_both_tables() {
        let conn = crate::db::open_in_memory().unwrap();
        seed(&conn);
        let repo = StructureRepository::new(&conn);
        repo.insert(&edge(100, 10, ItemKind::Elementary, 1.0)).unwrap();
        repo.insert(&edge(200, 100, ItemKind::Assembly, 1.0)).unwrap();

        assert_eq!(repo.count().unwrap(), 2);
        assert_eq!(repo.clear_all().unwrap(), 2);
        assert!(repo.load_all().unwrap().is_empty());
    }
}
