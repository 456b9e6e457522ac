// ==========================================
// 报表产物存储 - 查询条件构建器
// ==========================================
// 职责: 把可选过滤条件组合成一条参数化 SQL
// 约束: 条件之间只做 AND;列名只接受 &'static str,取值全部走占位符
// ==========================================

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

/// 单个限制条件
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    Eq(&'static str, Value),
    Ge(&'static str, Value),
    Le(&'static str, Value),
    /// 集合成员;空集合渲染为恒假
    In(&'static str, Vec<Value>),
}

impl Restriction {
    fn render(&self, next_idx: &mut usize, values: &mut Vec<Value>) -> String {
        let mut bind = |v: &Value| {
            values.push(v.clone());
            let placeholder = format!("?{}", *next_idx);
            *next_idx += 1;
            placeholder
        };

        match self {
            Restriction::Eq(col, v) => format!("{} = {}", col, bind(v)),
            Restriction::Ge(col, v) => format!("{} >= {}", col, bind(v)),
            Restriction::Le(col, v) => format!("{} <= {}", col, bind(v)),
            Restriction::In(_, vs) if vs.is_empty() => "1 = 0".to_string(),
            Restriction::In(col, vs) => {
                let placeholders = vs.iter().map(&mut bind).collect::<Vec<_>>().join(", ");
                format!("{} IN ({})", col, placeholders)
            }
        }
    }
}

/// 针对单表的条件集合 (AND 组合)
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    table: &'static str,
    restrictions: Vec<Restriction>,
}

impl Criteria {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            restrictions: Vec::new(),
        }
    }

    pub fn add(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    pub fn eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.add(Restriction::Eq(column, value.into()))
    }

    pub fn ge(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.add(Restriction::Ge(column, value.into()))
    }

    pub fn le(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.add(Restriction::Le(column, value.into()))
    }

    pub fn is_in<I, V>(self, column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add(Restriction::In(
            column,
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn is_unconstrained(&self) -> bool {
        self.restrictions.is_empty()
    }

    /// 渲染 SELECT 语句与参数
    pub fn to_select_sql(&self, columns: &str) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT {} FROM {}", columns, self.table);
        let mut values = Vec::new();
        let mut idx = 1;

        let clauses: Vec<String> = self
            .restrictions
            .iter()
            .map(|r| r.render(&mut idx, &mut values))
            .collect();

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        (sql, values)
    }

    /// 执行查询并映射每一行
    pub fn list<T, F>(&self, conn: &Connection, columns: &str, map_row: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let (sql, values) = self.to_select_sql(columns);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), map_row)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }
}
