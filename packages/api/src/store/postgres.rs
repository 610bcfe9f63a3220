//! PostgreSQL store implementation using SeaORM

use std::sync::Arc;

use antimatter::{
    model::{AppFilter, AppQuery, AppRecord, DeviceUsage, SubscriptionRecord},
    store::{Store, StoreError},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Schema, Set, Statement,
    sea_query::{Expr, OnConflict},
};

use crate::entity::{app, developer_device_usage, developer_subscription, push_token};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    db: Arc<DatabaseConnection>,
}

impl PostgresStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create the tables (and their indexes) that do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let tables = [
            schema.create_table_from_entity(app::Entity),
            schema.create_table_from_entity(developer_device_usage::Entity),
            schema.create_table_from_entity(developer_subscription::Entity),
            schema.create_table_from_entity(push_token::Entity),
        ];
        for mut table in tables {
            table.if_not_exists();
            self.db
                .execute(backend.build(&table))
                .await
                .map_err(db_err)?;
        }

        for mut index in schema.create_index_from_entity(developer_subscription::Entity) {
            index.if_not_exists();
            self.db
                .execute(backend.build(&index))
                .await
                .map_err(db_err)?;
        }

        tracing::info!("Postgres store schema ready");
        Ok(())
    }
}

fn db_err(e: sea_orm::DbErr) -> StoreError {
    StoreError::Database(e.to_string())
}

fn app_model_to_record(m: app::Model) -> Result<AppRecord, StoreError> {
    let corrupt = |field: &str, value: &str| {
        StoreError::Serialization(format!("app {}: invalid {field} '{value}'", m.id))
    };

    Ok(AppRecord {
        category: m
            .category
            .parse()
            .map_err(|_| corrupt("category", &m.category))?,
        device: m.device.parse().map_err(|_| corrupt("device", &m.device))?,
        status: m.status.parse().map_err(|_| corrupt("status", &m.status))?,
        id: m.id,
        name: m.name,
        description: m.description,
        developer_name: m.developer_name,
        version: m.version,
        ipa_path: m.ipa_path,
        icon_path: m.icon_path,
        social_twitter: m.social_twitter,
        social_website: m.social_website,
        app_store_link: m.app_store_link,
        created_at: m.created_at,
        uploaded_by_device_id: m.uploaded_by_device_id,
    })
}

fn usage_model_to_record(m: developer_device_usage::Model) -> DeviceUsage {
    DeviceUsage {
        device_id: m.device_id,
        upload_count: m.upload_count.max(0) as u64,
        updated_at: m.updated_at,
    }
}

fn subscription_model_to_record(m: developer_subscription::Model) -> SubscriptionRecord {
    SubscriptionRecord {
        device_id: m.device_id,
        external_customer_id: m.stripe_customer_id,
        current_period_end: m.current_period_end,
        updated_at: m.updated_at,
    }
}

#[async_trait]
impl Store for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert_app(&self, record: AppRecord) -> Result<AppRecord, StoreError> {
        let model = app::ActiveModel {
            id: Set(record.id),
            name: Set(record.name),
            description: Set(record.description),
            developer_name: Set(record.developer_name),
            version: Set(record.version),
            category: Set(record.category.as_str().to_string()),
            ipa_path: Set(record.ipa_path),
            device: Set(record.device.as_str().to_string()),
            icon_path: Set(record.icon_path),
            social_twitter: Set(record.social_twitter),
            social_website: Set(record.social_website),
            app_store_link: Set(record.app_store_link),
            status: Set(record.status.as_str().to_string()),
            created_at: Set(record.created_at),
            uploaded_by_device_id: Set(record.uploaded_by_device_id),
        };

        let result = model.insert(self.db.as_ref()).await.map_err(db_err)?;
        app_model_to_record(result)
    }

    async fn get_app(&self, id: &str) -> Result<Option<AppRecord>, StoreError> {
        app::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(app_model_to_record)
            .transpose()
    }

    async fn list_apps(&self, query: &AppQuery) -> Result<Vec<AppRecord>, StoreError> {
        let select = match &query.filter {
            AppFilter::Statuses(statuses) => app::Entity::find()
                .filter(app::Column::Status.is_in(statuses.iter().map(|s| s.as_str()))),
            AppFilter::UploadedBy(device_id) => {
                app::Entity::find().filter(app::Column::UploadedByDeviceId.eq(device_id.as_str()))
            }
        };

        select
            .order_by_desc(app::Column::CreatedAt)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(app_model_to_record)
            .collect()
    }

    async fn delete_app(&self, id: &str) -> Result<bool, StoreError> {
        let result = app::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn get_usage(&self, device_id: &str) -> Result<Option<DeviceUsage>, StoreError> {
        let result = developer_device_usage::Entity::find_by_id(device_id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.map(usage_model_to_record))
    }

    async fn increment_usage(
        &self,
        device_id: &str,
        at: DateTime<Utc>,
    ) -> Result<DeviceUsage, StoreError> {
        // Single statement so concurrent submissions cannot lose an increment.
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"INSERT INTO "developer_device_usage" ("device_id", "upload_count", "updated_at")
               VALUES ($1, 1, $2)
               ON CONFLICT ("device_id") DO UPDATE
               SET "upload_count" = "developer_device_usage"."upload_count" + 1,
                   "updated_at" = EXCLUDED."updated_at"
               RETURNING "device_id", "upload_count", "updated_at""#,
            [device_id.into(), at.into()],
        );

        let model = developer_device_usage::Entity::find()
            .from_raw_sql(statement)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::Database("usage upsert returned no row".into()))?;

        Ok(usage_model_to_record(model))
    }

    async fn get_subscription(
        &self,
        device_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let result = developer_subscription::Entity::find_by_id(device_id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.map(subscription_model_to_record))
    }

    async fn upsert_subscription(&self, record: SubscriptionRecord) -> Result<(), StoreError> {
        let model = developer_subscription::ActiveModel {
            device_id: Set(record.device_id),
            stripe_customer_id: Set(record.external_customer_id),
            current_period_end: Set(record.current_period_end),
            updated_at: Set(record.updated_at),
        };

        developer_subscription::Entity::insert(model)
            .on_conflict(
                OnConflict::column(developer_subscription::Column::DeviceId)
                    .update_columns([
                        developer_subscription::Column::StripeCustomerId,
                        developer_subscription::Column::CurrentPeriodEnd,
                        developer_subscription::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_period_end_for_customer(
        &self,
        external_customer_id: &str,
        current_period_end: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = developer_subscription::Entity::update_many()
            .col_expr(
                developer_subscription::Column::CurrentPeriodEnd,
                Expr::value(current_period_end),
            )
            .col_expr(developer_subscription::Column::UpdatedAt, Expr::value(at))
            .filter(developer_subscription::Column::StripeCustomerId.eq(external_customer_id))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn upsert_push_token(
        &self,
        token: &str,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let model = push_token::ActiveModel {
            token: Set(token.to_string()),
            enabled: Set(enabled),
            updated_at: Set(at),
        };

        push_token::Entity::insert(model)
            .on_conflict(
                OnConflict::column(push_token::Column::Token)
                    .update_columns([push_token::Column::Enabled, push_token::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn enabled_push_tokens(&self) -> Result<Vec<String>, StoreError> {
        push_token::Entity::find()
            .select_only()
            .column(push_token::Column::Token)
            .filter(push_token::Column::Enabled.eq(true))
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }
}
