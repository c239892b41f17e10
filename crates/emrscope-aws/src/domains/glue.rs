// Glue Data Catalog: databases and their tables.
//
// Tables are addressed as `<database>/<table>`; `describe` on such an id
// returns the table schema.

use async_trait::async_trait;
use aws_sdk_glue::operation::get_database::GetDatabaseError;
use aws_sdk_glue::operation::get_table::GetTableError;
use aws_sdk_glue::types::{Column, Database, Table};
use emrscope_core::{
    ChildKind, CoreError, Page, PageToken, ResourceClient, ResourceDescriptor, ResourceDetail,
    StatusSet,
};
use tracing::{debug, info};

use super::{next_token, opt, owned, token_string};
use crate::error::Error;
use crate::session::AwsSession;

pub const KEY: &str = "glue-catalog";
pub const TABLES: ChildKind = ChildKind::new("tables", "Tables");

/// Glue Data Catalog databases.
#[derive(Debug, Clone)]
pub struct GlueCatalog {
    session: AwsSession,
}

impl GlueCatalog {
    pub fn new(session: AwsSession) -> Self {
        Self { session }
    }

    async fn describe_database(&self, name: &str) -> Result<Option<ResourceDetail>, Error> {
        let result = self
            .session
            .glue()
            .await
            .get_database()
            .name(name)
            .send()
            .await;

        match result {
            Ok(out) => Ok(out.database().and_then(database_detail)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(GetDatabaseError::is_entity_not_found_exception) =>
            {
                debug!(database = name, "database not found");
                Ok(None)
            }
            Err(err) => Err(Error::sdk(KEY, "GetDatabase", &err)),
        }
    }

    async fn describe_table(&self, database: &str, table: &str) -> Result<Option<ResourceDetail>, Error> {
        if table.is_empty() {
            return Err(Error::MalformedId {
                domain: KEY,
                id: format!("{database}/"),
                reason: "expected <database>/<table>",
            });
        }

        let result = self
            .session
            .glue()
            .await
            .get_table()
            .database_name(database)
            .name(table)
            .send()
            .await;

        match result {
            Ok(out) => Ok(out.table().and_then(|t| table_detail(database, t))),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(GetTableError::is_entity_not_found_exception) =>
            {
                debug!(database, table, "table not found");
                Ok(None)
            }
            Err(err) => Err(Error::sdk(KEY, "GetTable", &err)),
        }
    }
}

#[async_trait]
impl ResourceClient for GlueCatalog {
    fn key(&self) -> &'static str {
        KEY
    }

    fn display_name(&self) -> &'static str {
        "Glue Data Catalog"
    }

    fn child_kinds(&self, _resource: &ResourceDescriptor) -> Vec<ChildKind> {
        vec![TABLES]
    }

    async fn list(
        &self,
        _filter: Option<&StatusSet>,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError> {
        info!(region = %self.session.region(), "Glue: fetching databases");
        let out = self
            .session
            .glue()
            .await
            .get_databases()
            .set_next_token(token_string(token))
            .send()
            .await
            .map_err(|e| Error::sdk(KEY, "GetDatabases", &e))?;

        Ok(Page::new(
            out.database_list().iter().filter_map(database_descriptor).collect(),
            next_token(out.next_token()),
        ))
    }

    async fn describe(&self, id: &str) -> Result<Option<ResourceDetail>, CoreError> {
        let detail = match id.split_once('/') {
            Some((database, table)) => self.describe_table(database, table).await?,
            None => self.describe_database(id).await?,
        };
        Ok(detail)
    }

    async fn list_children(
        &self,
        parent_id: &str,
        _kind: ChildKind,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError> {
        info!(region = %self.session.region(), database = parent_id, "Glue: fetching tables");
        let out = self
            .session
            .glue()
            .await
            .get_tables()
            .database_name(parent_id)
            .set_next_token(token_string(token))
            .send()
            .await
            .map_err(|e| Error::sdk(KEY, "GetTables", &e))?;

        Ok(Page::new(
            out.table_list()
                .iter()
                .filter_map(|t| table_descriptor(parent_id, t))
                .collect(),
            next_token(out.next_token()),
        ))
    }
}

// ── Mapping ─────────────────────────────────────────────────────────

fn database_descriptor(db: &Database) -> Option<ResourceDescriptor> {
    let name: Option<&str> = opt(db.name());
    let name = owned(name)?;
    Some(ResourceDescriptor {
        id: name.clone(),
        name,
        status: None,
        status_detail: None,
        description: owned(db.description()),
    })
}

fn database_detail(db: &Database) -> Option<ResourceDetail> {
    Some(
        ResourceDetail::new(database_descriptor(db)?)
            .attr("location", db.location_uri())
            .attr("created", db.create_time().map(ToString::to_string))
            .attr("catalog_id", db.catalog_id()),
    )
}

fn table_descriptor(database: &str, table: &Table) -> Option<ResourceDescriptor> {
    let name: Option<&str> = opt(table.name());
    let name = owned(name)?;
    Some(ResourceDescriptor {
        id: format!("{database}/{name}"),
        name,
        status: None,
        status_detail: None,
        description: owned(table.table_type()),
    })
}

/// `type` or `type (comment)`.
fn column_text(column: &Column) -> String {
    let kind = column.r#type().unwrap_or("unknown");
    match owned(column.comment()) {
        Some(comment) => format!("{kind} ({comment})"),
        None => kind.to_owned(),
    }
}

fn column_name(column: &Column) -> Option<&str> {
    opt(column.name())
}

fn table_detail(database: &str, table: &Table) -> Option<ResourceDetail> {
    let mut detail = ResourceDetail::new(table_descriptor(database, table)?)
        .attr("database", Some(database))
        .attr("table_type", table.table_type())
        .attr("owner", table.owner())
        .attr("created", table.create_time().map(ToString::to_string))
        .attr("updated", table.update_time().map(ToString::to_string));

    if let Some(storage) = table.storage_descriptor() {
        detail = detail
            .attr("location", storage.location())
            .attr("input_format", storage.input_format())
            .attr("output_format", storage.output_format());
        for column in storage.columns() {
            if let Some(name) = column_name(column) {
                detail = detail.attr(&format!("column:{name}"), Some(column_text(column)));
            }
        }
    }
    for key in table.partition_keys() {
        if let Some(name) = column_name(key) {
            detail = detail.attr(&format!("partition:{name}"), Some(column_text(key)));
        }
    }
    Some(detail)
}
