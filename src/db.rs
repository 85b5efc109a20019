use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result, Row};

use crate::gateway::{Gateway, GatewayError, TransactionQuery};
use crate::models::{
    Category, CategoryInput, Profile, ProfileUpdate, Transaction, TransactionInput, User,
};
use crate::money::Currency;

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn init_db(path: &Path) -> std::result::Result<DbPool, GatewayError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::new(manager)?;
    {
        let conn = pool.get()?;
        run_migrations(&conn)?;
    }
    Ok(pool)
}

pub(crate) fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            token TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id INTEGER PRIMARY KEY,
            full_name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL,
            currency TEXT NOT NULL DEFAULT 'BRL',
            FOREIGN KEY(id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('income', 'expense')),
            color TEXT NOT NULL DEFAULT '#000000',
            icon TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL CHECK(amount_cents >= 0),
            occurred_on TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('income', 'expense')),
            status TEXT NOT NULL DEFAULT 'completed'
                CHECK(status IN ('pending', 'completed', 'cancelled')),
            category_id INTEGER,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS transactions_user_date
            ON transactions(user_id, occurred_on);
        ",
    )
}

/// Creates the login and its profile row together.
pub fn create_account(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    created_at: &str,
    currency: Currency,
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
        params![email, password_hash, created_at],
    )?;
    let user_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO profiles (id, full_name, email, currency) VALUES (?1, '', ?2, ?3)",
        params![user_id, email, currency.code()],
    )?;
    tx.commit()?;
    Ok(user_id)
}

pub fn user_credentials(conn: &Connection, email: &str) -> Result<Option<(i64, String)>> {
    conn.query_row(
        "
        SELECT id, password_hash
        FROM users
        WHERE email = ?1
        ",
        params![email],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

pub fn create_session(conn: &Connection, user_id: i64, token: &str, created_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (user_id, token, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, token, created_at],
    )?;
    Ok(())
}

pub fn user_by_session(conn: &Connection, token: &str) -> Result<Option<User>> {
    conn.query_row(
        "
        SELECT u.id, u.email
        FROM sessions s
        JOIN users u ON s.user_id = u.id
        WHERE s.token = ?1
        ",
        params![token],
        |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn delete_session(conn: &Connection, token: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

pub fn prune_sessions(conn: &Connection, user_id: i64, keep: i64) -> Result<()> {
    conn.execute(
        "
        DELETE FROM sessions
        WHERE user_id = ?1
          AND id NOT IN (
            SELECT id
            FROM sessions
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
          )
        ",
        params![user_id, keep],
    )?;
    Ok(())
}

/// Gateway over the SQLite store for a single user.
pub struct UserStore<'c> {
    conn: &'c Connection,
    user_id: i64,
}

impl<'c> UserStore<'c> {
    pub fn new(conn: &'c Connection, user_id: i64) -> Self {
        UserStore { conn, user_id }
    }

    fn expect_changed(changed: usize, id: i64) -> std::result::Result<(), GatewayError> {
        if changed == 0 {
            Err(GatewayError::NotFound(id))
        } else {
            Ok(())
        }
    }
}

const TRANSACTION_COLUMNS: &str = "
    SELECT t.id, t.description, t.amount_cents, t.occurred_on, t.kind, t.status,
           t.category_id, c.name, c.color
    FROM transactions t
    LEFT JOIN categories c ON t.category_id = c.id
";

fn transaction_from_row(row: &Row<'_>) -> Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount_cents: row.get(2)?,
        occurred_on: row.get(3)?,
        kind: row.get(4)?,
        status: row.get(5)?,
        category_id: row.get(6)?,
        category_name: row.get(7)?,
        category_color: row.get(8)?,
    })
}

fn category_from_row(row: &Row<'_>) -> Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        color: row.get(3)?,
        icon: row.get(4)?,
    })
}

fn not_found(id: i64) -> impl FnOnce(rusqlite::Error) -> GatewayError {
    move |err| match err {
        rusqlite::Error::QueryReturnedNoRows => GatewayError::NotFound(id),
        other => GatewayError::Database(other),
    }
}

impl Gateway for UserStore<'_> {
    fn list_categories(&self) -> std::result::Result<Vec<Category>, GatewayError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, name, kind, color, icon
            FROM categories
            WHERE user_id = ?1
            ORDER BY name, id
            ",
        )?;
        let rows = stmt.query_map(params![self.user_id], category_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_category(&self, id: i64) -> std::result::Result<Category, GatewayError> {
        self.conn
            .query_row(
                "
                SELECT id, name, kind, color, icon
                FROM categories
                WHERE id = ?1 AND user_id = ?2
                ",
                params![id, self.user_id],
                category_from_row,
            )
            .map_err(not_found(id))
    }

    fn insert_category(&self, input: &CategoryInput) -> std::result::Result<Category, GatewayError> {
        self.conn.execute(
            "INSERT INTO categories (user_id, name, kind, color, icon) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![self.user_id, input.name, input.kind, input.color, input.icon],
        )?;
        self.get_category(self.conn.last_insert_rowid())
    }

    fn update_category(
        &self,
        id: i64,
        input: &CategoryInput,
    ) -> std::result::Result<Category, GatewayError> {
        let changed = self.conn.execute(
            "
            UPDATE categories
            SET name = ?1, kind = ?2, color = ?3, icon = ?4
            WHERE id = ?5 AND user_id = ?6
            ",
            params![input.name, input.kind, input.color, input.icon, id, self.user_id],
        )?;
        Self::expect_changed(changed, id)?;
        self.get_category(id)
    }

    fn delete_category(&self, id: i64) -> std::result::Result<(), GatewayError> {
        let changed = self.conn.execute(
            "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
            params![id, self.user_id],
        )?;
        Self::expect_changed(changed, id)
    }

    fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> std::result::Result<Vec<Transaction>, GatewayError> {
        let mut sql = format!("{TRANSACTION_COLUMNS} WHERE t.user_id = ?1");
        let mut values = vec![Value::Integer(self.user_id)];
        if let Some(start) = query.start {
            values.push(Value::Text(start.format("%Y-%m-%d").to_string()));
            sql.push_str(&format!(" AND t.occurred_on >= ?{}", values.len()));
        }
        if let Some(end) = query.end {
            values.push(Value::Text(end.format("%Y-%m-%d").to_string()));
            sql.push_str(&format!(" AND t.occurred_on <= ?{}", values.len()));
        }
        if let Some(kind) = query.kind {
            values.push(Value::Text(kind.as_str().to_string()));
            sql.push_str(&format!(" AND t.kind = ?{}", values.len()));
        }
        if let Some(category_id) = query.category_id {
            values.push(Value::Integer(category_id));
            sql.push_str(&format!(" AND t.category_id = ?{}", values.len()));
        }
        let order = query.order.sql();
        sql.push_str(&format!(" ORDER BY t.occurred_on {order}, t.id {order}"));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), transaction_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_transaction(&self, id: i64) -> std::result::Result<Transaction, GatewayError> {
        self.conn
            .query_row(
                &format!("{TRANSACTION_COLUMNS} WHERE t.id = ?1 AND t.user_id = ?2"),
                params![id, self.user_id],
                transaction_from_row,
            )
            .map_err(not_found(id))
    }

    fn insert_transaction(
        &self,
        input: &TransactionInput,
    ) -> std::result::Result<Transaction, GatewayError> {
        self.conn.execute(
            "
            INSERT INTO transactions
                (user_id, description, amount_cents, occurred_on, kind, status, category_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                self.user_id,
                input.description,
                input.amount_cents,
                input.occurred_on,
                input.kind,
                input.status,
                input.category_id
            ],
        )?;
        self.get_transaction(self.conn.last_insert_rowid())
    }

    fn update_transaction(
        &self,
        id: i64,
        input: &TransactionInput,
    ) -> std::result::Result<Transaction, GatewayError> {
        let changed = self.conn.execute(
            "
            UPDATE transactions
            SET description = ?1, amount_cents = ?2, occurred_on = ?3,
                kind = ?4, status = ?5, category_id = ?6
            WHERE id = ?7 AND user_id = ?8
            ",
            params![
                input.description,
                input.amount_cents,
                input.occurred_on,
                input.kind,
                input.status,
                input.category_id,
                id,
                self.user_id
            ],
        )?;
        Self::expect_changed(changed, id)?;
        self.get_transaction(id)
    }

    fn delete_transaction(&self, id: i64) -> std::result::Result<(), GatewayError> {
        let changed = self.conn.execute(
            "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
            params![id, self.user_id],
        )?;
        Self::expect_changed(changed, id)
    }

    fn profile(&self) -> std::result::Result<Profile, GatewayError> {
        self.conn
            .query_row(
                "
                SELECT id, full_name, email, currency
                FROM profiles
                WHERE id = ?1
                ",
                params![self.user_id],
                |row| {
                    let currency: String = row.get(3)?;
                    Ok(Profile {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                        email: row.get(2)?,
                        currency: Currency::from_code(&currency),
                    })
                },
            )
            .map_err(not_found(self.user_id))
    }

    fn update_profile(&self, update: &ProfileUpdate) -> std::result::Result<Profile, GatewayError> {
        let changed = self.conn.execute(
            "UPDATE profiles SET full_name = ?1, currency = ?2 WHERE id = ?3",
            params![update.full_name, update.currency.code(), self.user_id],
        )?;
        Self::expect_changed(changed, self.user_id)?;
        self.profile()
    }
}
