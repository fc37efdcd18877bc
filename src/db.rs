use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::model::{Category, Item, ShoppingList};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database: {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS shopping_lists (
            id         INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
            id         INTEGER PRIMARY KEY,
            list_id    INTEGER NOT NULL REFERENCES shopping_lists(id) ON DELETE CASCADE,
            name       TEXT NOT NULL,
            category   TEXT NOT NULL CHECK(category IN
                ('bakery','meat','dairy','vegetables','fruits','cosmetics','other')),
            sort_order INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_items_list ON items(list_id, sort_order);
        ",
    )?;
    Ok(())
}

pub struct ListSummary {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub item_count: i64,
}

pub struct StoredItem {
    pub id: i64,
    pub item: Item,
}

/// Store a new list with its items; returns the list id.
pub fn save_list(conn: &mut Connection, list: &ShoppingList) -> Result<i64> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO shopping_lists (name, created_at) VALUES (?1, ?2)",
        params![list.name, list.created_at.to_rfc3339()],
    )?;
    let list_id = tx.last_insert_rowid();
    insert_items(&tx, list_id, &list.items)?;
    tx.commit()?;
    Ok(list_id)
}

pub fn append_items(conn: &mut Connection, list_id: i64, items: &[Item]) -> Result<()> {
    let tx = conn.transaction()?;
    insert_items(&tx, list_id, items)?;
    tx.commit()?;
    Ok(())
}

fn insert_items(conn: &Connection, list_id: i64, items: &[Item]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO items (list_id, name, category, sort_order) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for item in items {
        stmt.execute(params![
            list_id,
            item.name(),
            item.category().as_str(),
            item.sort_order()
        ])?;
    }
    Ok(())
}

pub fn fetch_lists(conn: &Connection) -> Result<Vec<ListSummary>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.name, l.created_at, COUNT(i.id)
         FROM shopping_lists l
         LEFT JOIN items i ON i.list_id = l.id
         GROUP BY l.id
         ORDER BY l.created_at DESC, l.id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ListSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
                item_count: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_list(conn: &Connection, list_id: i64) -> Result<Option<(ShoppingList, Vec<StoredItem>)>> {
    let header: Option<(String, String)> = conn
        .query_row(
            "SELECT name, created_at FROM shopping_lists WHERE id = ?1",
            params![list_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((name, created_at)) = header else {
        return Ok(None);
    };
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .with_context(|| format!("bad timestamp on list {}", list_id))?
        .with_timezone(&Utc);

    let mut stmt = conn.prepare(
        "SELECT id, name, category, sort_order FROM items WHERE list_id = ?1 ORDER BY sort_order, id",
    )?;
    let raw = stmt
        .query_map(params![list_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stored = Vec::with_capacity(raw.len());
    for (id, name, category, sort_order) in raw {
        let category: Category = category.parse()?;
        stored.push(StoredItem {
            id,
            item: Item::new(name, category, sort_order),
        });
    }

    let list = ShoppingList {
        name,
        created_at,
        items: stored.iter().map(|s| s.item.clone()).collect(),
    };
    Ok(Some((list, stored)))
}

pub fn item_count(conn: &Connection, list_id: i64) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM items WHERE list_id = ?1",
        params![list_id],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}

/// Returns false when no list had that id.
pub fn delete_list(conn: &Connection, list_id: i64) -> Result<bool> {
    let n = conn.execute("DELETE FROM shopping_lists WHERE id = ?1", params![list_id])?;
    Ok(n > 0)
}

pub fn delete_item(conn: &Connection, item_id: i64) -> Result<bool> {
    let n = conn.execute("DELETE FROM items WHERE id = ?1", params![item_id])?;
    Ok(n > 0)
}
