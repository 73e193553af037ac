use async_trait::async_trait;
use diesel::connection::TransactionManager;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::{Connection, PgConnection};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use strandline_core::node::{Node, NodeId};
use strandline_core::storage::{Predicate, PointerMutation, StorageAdapter};

use crate::database::Database;
use crate::error::StoreError;
use crate::models::{NewNodeRow, NodeRow};
use crate::schema::nodes;

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// A transactional session against the connection pool: one pooled connection whose
/// isolation level has been raised to `SERIALIZABLE` for the lifetime of the session.
///
/// The connection is held as an `Option` so each operation can move it onto the
/// blocking pool via `tokio::task::spawn_blocking` and hand it back afterwards,
/// rather than running Diesel's blocking calls directly on the async reactor.
pub struct PgSession {
    conn: Option<PgPooledConnection>,
}

impl PgSession {
    async fn with_conn<F, R>(&mut self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let mut conn = self.conn.take().expect("session used after commit/rollback");
        let (result, conn) = tokio::task::spawn_blocking(move || {
            let result = f(&mut conn);
            (result, conn)
        })
        .await
        .expect("blocking database task panicked");
        self.conn = Some(conn);
        result
    }
}

/// The Postgres realization of [`StorageAdapter`].
#[derive(Debug, Clone)]
pub struct PgAdapter {
    database: Database,
}

impl PgAdapter {
    pub fn new(database: Database) -> Self {
        PgAdapter { database }
    }
}

#[async_trait]
impl StorageAdapter for PgAdapter {
    type Session = PgSession;
    type Error = StoreError;

    async fn begin(&self) -> Result<Self::Session, Self::Error> {
        // A session owns one pooled connection for its whole lifetime -- `Database::run`
        // checks connections back in between calls, which would lose the open
        // transaction, so the connection is checked out once here instead.
        let conn = self.database.checkout().await?;
        let mut session = PgSession { conn: Some(conn) };
        session
            .with_conn(|conn| {
                diesel::sql_query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE").execute(conn)?;
                <PgConnection as Connection>::TransactionManager::begin_transaction(conn)?;
                Ok(())
            })
            .await?;
        Ok(session)
    }

    async fn commit(&self, mut session: Self::Session) -> Result<(), Self::Error> {
        session
            .with_conn(|conn| {
                <PgConnection as Connection>::TransactionManager::commit_transaction(conn)?;
                Ok(())
            })
            .await
    }

    async fn rollback(&self, mut session: Self::Session) -> Result<(), Self::Error> {
        session
            .with_conn(|conn| {
                <PgConnection as Connection>::TransactionManager::rollback_transaction(conn)?;
                Ok(())
            })
            .await
    }

    async fn find(
        &self,
        session: &mut Self::Session,
        id: NodeId,
    ) -> Result<Option<Node>, Self::Error> {
        session
            .with_conn(move |conn| {
                let row = nodes::table.find(id).first::<NodeRow>(conn).optional()?;
                Ok(row.map(Node::from))
            })
            .await
    }

    async fn find_head(&self, session: &mut Self::Session) -> Result<Option<Node>, Self::Error> {
        session
            .with_conn(|conn| {
                let row = nodes::table
                    .filter(nodes::prev.is_null())
                    .first::<NodeRow>(conn)
                    .optional()?;
                Ok(row.map(Node::from))
            })
            .await
    }

    async fn find_all(&self, session: &mut Self::Session) -> Result<Vec<Node>, Self::Error> {
        session
            .with_conn(|conn| {
                let rows = nodes::table.load::<NodeRow>(conn)?;
                Ok(rows.into_iter().map(Node::from).collect())
            })
            .await
    }

    async fn insert(&self, session: &mut Self::Session, node: Node) -> Result<(), Self::Error> {
        session
            .with_conn(move |conn| {
                diesel::insert_into(nodes::table)
                    .values(NewNodeRow::from(node))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    async fn conditional_update(
        &self,
        session: &mut Self::Session,
        id: NodeId,
        predicate: Predicate,
        mutation: PointerMutation,
    ) -> Result<Option<Node>, Self::Error> {
        session
            .with_conn(move |conn| {
                // The predicate is a conjunction of optional checks, so it's built as a
                // boxed expression rather than threading an `UpdateStatement` type that
                // would change shape per combination of `Some`/`None`.
                let mut predicate_expr: Box<
                    dyn diesel::BoxableExpression<nodes::table, diesel::pg::Pg, SqlType = diesel::sql_types::Bool>,
                > = Box::new(nodes::version.eq(predicate.version));
                if let Some(prev) = predicate.prev {
                    predicate_expr = Box::new(predicate_expr.and(nodes::prev.eq(prev)));
                }
                if let Some(next) = predicate.next {
                    predicate_expr = Box::new(predicate_expr.and(nodes::next.eq(next)));
                }

                let target = diesel::update(nodes::table.find(id)).filter(predicate_expr);

                let result = match (mutation.prev, mutation.next) {
                    (Some(prev), Some(next)) => target
                        .set((
                            nodes::prev.eq(prev),
                            nodes::next.eq(next),
                            nodes::version.eq(nodes::version + 1),
                        ))
                        .get_result::<NodeRow>(conn),
                    (Some(prev), None) => target
                        .set((nodes::prev.eq(prev), nodes::version.eq(nodes::version + 1)))
                        .get_result::<NodeRow>(conn),
                    (None, Some(next)) => target
                        .set((nodes::next.eq(next), nodes::version.eq(nodes::version + 1)))
                        .get_result::<NodeRow>(conn),
                    (None, None) => target
                        .set(nodes::version.eq(nodes::version + 1))
                        .get_result::<NodeRow>(conn),
                };

                match result {
                    Ok(row) => Ok(Some(Node::from(row))),
                    Err(diesel::result::Error::NotFound) => Ok(None),
                    Err(err) => Err(StoreError::from(err)),
                }
            })
            .await
    }

    async fn conditional_delete(
        &self,
        session: &mut Self::Session,
        id: NodeId,
        version: i64,
    ) -> Result<bool, Self::Error> {
        session
            .with_conn(move |conn| {
                let affected = diesel::delete(nodes::table.find(id))
                    .filter(nodes::version.eq(version))
                    .execute(conn)?;
                Ok(affected == 1)
            })
            .await
    }

    fn is_serialization_conflict(&self, error: &Self::Error) -> bool {
        error.is_serialization_failure()
    }
}
