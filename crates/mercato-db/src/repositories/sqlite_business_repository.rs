//! `SQLite` implementations of the listing, service and review repositories.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use mercato_core::{
    Business, BusinessRepository, BusinessSearch, NewBusiness, NewReview, RepositoryError, Review,
    ReviewRepository, SearchPage, Service, ServiceInput, ServiceRepository, SubscriptionTier,
    VerificationStatus,
};

use super::row_mappers::{
    BUSINESS_SELECT_COLUMNS, REVIEW_SELECT_COLUMNS, SERVICE_SELECT_COLUMNS, escape_like, now,
    row_to_business, row_to_review, row_to_service, storage, write_error,
};

/// Ranking applied to every search: paid tiers first, then rating, then newest.
const SEARCH_ORDER: &str = " ORDER BY CASE subscription_tier WHEN 'PREMIUM' THEN 2 WHEN 'PRO' THEN 1 ELSE 0 END DESC, rating_avg DESC, created_at DESC, id DESC";

/// Append the WHERE conditions for a search. The builder must already end
/// in a `WHERE 1 = 1` clause.
fn push_search_filters(qb: &mut QueryBuilder<'_, Sqlite>, search: &BusinessSearch) {
    if let Some(q) = &search.q {
        let pattern = format!("%{}%", escape_like(q));
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR description LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR category LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(category) = &search.category {
        qb.push(" AND category = ")
            .push_bind(category.clone())
            .push(" COLLATE NOCASE");
    }
    if let Some(city) = &search.city {
        qb.push(" AND city = ")
            .push_bind(city.clone())
            .push(" COLLATE NOCASE");
    }
    if search.verified_only {
        qb.push(" AND verification_status = 'VERIFIED'");
    }
    if search.ai_agents_only {
        qb.push(" AND is_ai_agent = 1");
    }
}

/// `SQLite` implementation of the `BusinessRepository` trait.
pub struct SqliteBusinessRepository {
    pool: SqlitePool,
}

impl SqliteBusinessRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        condition: &str,
        value: impl Into<String> + Send,
    ) -> Result<Option<Business>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {BUSINESS_SELECT_COLUMNS} FROM businesses WHERE {condition}"
        ))
        .bind(value.into())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(row_to_business).transpose()
    }
}

#[async_trait]
impl BusinessRepository for SqliteBusinessRepository {
    async fn insert(&self, business: &NewBusiness) -> Result<Business, RepositoryError> {
        let profile = &business.profile;
        let stamp = now();
        let result = sqlx::query(
            r"INSERT INTO businesses
              (owner_id, name, slug, description, category, city, phone, website,
               is_ai_agent, ai_prompt, ai_price_cents, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(business.owner_id)
        .bind(&profile.name)
        .bind(&business.slug)
        .bind(&profile.description)
        .bind(&profile.category)
        .bind(&profile.city)
        .bind(&profile.phone)
        .bind(&profile.website)
        .bind(profile.is_ai_agent)
        .bind(&profile.ai_prompt)
        .bind(profile.ai_price_cents)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &format!("listing {}", business.slug)))?;

        self.get_by_id(result.last_insert_rowid()).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Business, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {BUSINESS_SELECT_COLUMNS} FROM businesses WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| RepositoryError::NotFound(format!("listing {id}")))?;

        row_to_business(&row)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Business, RepositoryError> {
        self.fetch_where("slug = ?", slug)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("listing {slug}")))
    }

    async fn find_by_owner(&self, owner_id: i64) -> Result<Option<Business>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {BUSINESS_SELECT_COLUMNS} FROM businesses WHERE owner_id = ?"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(row_to_business).transpose()
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM businesses WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(count > 0)
    }

    async fn update(&self, business: &Business) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"UPDATE businesses SET
              name = ?, slug = ?, description = ?, category = ?, city = ?, phone = ?,
              website = ?, is_ai_agent = ?, ai_prompt = ?, ai_price_cents = ?, updated_at = ?
              WHERE id = ?",
        )
        .bind(&business.name)
        .bind(&business.slug)
        .bind(&business.description)
        .bind(&business.category)
        .bind(&business.city)
        .bind(&business.phone)
        .bind(&business.website)
        .bind(business.is_ai_agent)
        .bind(&business.ai_prompt)
        .bind(business.ai_price_cents)
        .bind(now())
        .bind(business.id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &format!("listing {}", business.slug)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("listing {}", business.id)));
        }
        Ok(())
    }

    async fn search(
        &self,
        search: &BusinessSearch,
    ) -> Result<SearchPage<Business>, RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM businesses WHERE 1 = 1");
        push_search_filters(&mut count, search);
        let (total,): (i64,) = count
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {BUSINESS_SELECT_COLUMNS} FROM businesses WHERE 1 = 1"
        ));
        push_search_filters(&mut select, search);
        select
            .push(SEARCH_ORDER)
            .push(" LIMIT ")
            .push_bind(i64::from(search.per_page))
            .push(" OFFSET ")
            .push_bind(i64::from(search.offset()));

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        let items = rows.iter().map(row_to_business).collect::<Result<Vec<_>, _>>()?;

        debug!(total, returned = items.len(), page = search.page, "Listing search");
        Ok(SearchPage {
            items,
            total,
            page: search.page,
            per_page: search.per_page,
        })
    }

    async fn list_all(&self) -> Result<Vec<Business>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BUSINESS_SELECT_COLUMNS} FROM businesses ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_business).collect()
    }

    async fn set_tier(&self, id: i64, tier: SubscriptionTier) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE businesses SET subscription_tier = ?, updated_at = ? WHERE id = ?")
                .bind(tier.as_str())
                .bind(now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("listing {id}")));
        }
        Ok(())
    }

    async fn set_verification(
        &self,
        id: i64,
        status: VerificationStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE businesses SET verification_status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("listing {id}")));
        }
        Ok(())
    }
}

/// `SQLite` implementation of the `ServiceRepository` trait.
pub struct SqliteServiceRepository {
    pool: SqlitePool,
}

impl SqliteServiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceRepository for SqliteServiceRepository {
    async fn list_for_business(&self, business_id: i64) -> Result<Vec<Service>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SERVICE_SELECT_COLUMNS} FROM services WHERE business_id = ? ORDER BY id"
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_service).collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Service, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SERVICE_SELECT_COLUMNS} FROM services WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| RepositoryError::NotFound(format!("service {id}")))?;

        row_to_service(&row)
    }

    async fn insert(
        &self,
        business_id: i64,
        input: &ServiceInput,
    ) -> Result<Service, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO services (business_id, name, description, price_cents, duration_minutes, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(business_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(input.duration_minutes)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "service"))?;

        self.get_by_id(result.last_insert_rowid()).await
    }

    async fn update(&self, id: i64, input: &ServiceInput) -> Result<Service, RepositoryError> {
        let result = sqlx::query(
            "UPDATE services SET name = ?, description = ?, price_cents = ?, duration_minutes = ? WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(input.duration_minutes)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "service"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("service {id}")));
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM services WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("service {id}")));
        }
        Ok(())
    }
}

/// `SQLite` implementation of the `ReviewRepository` trait.
///
/// Inserting a review refreshes the listing's `rating_avg` and
/// `review_count` in the same transaction.
pub struct SqliteReviewRepository {
    pool: SqlitePool,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    async fn list_for_business(&self, business_id: i64) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_SELECT_COLUMNS} FROM reviews WHERE business_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_review).collect()
    }

    async fn insert(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let stamp = now();

        let result = sqlx::query(
            "INSERT INTO reviews (business_id, author_id, rating, comment, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(review.business_id)
        .bind(review.author_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(&stamp)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "review by this author"))?;

        sqlx::query(
            r"UPDATE businesses SET
              rating_avg = (SELECT COALESCE(AVG(rating), 0) FROM reviews WHERE business_id = ?),
              review_count = (SELECT COUNT(*) FROM reviews WHERE business_id = ?),
              updated_at = ?
              WHERE id = ?",
        )
        .bind(review.business_id)
        .bind(review.business_id)
        .bind(&stamp)
        .bind(review.business_id)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        let row = sqlx::query(&format!(
            "SELECT {REVIEW_SELECT_COLUMNS} FROM reviews WHERE id = ?"
        ))
        .bind(result.last_insert_rowid())
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;
        let created = row_to_review(&row)?;

        tx.commit().await.map_err(storage)?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::SqliteUserRepository;
    use crate::setup::setup_test_database;
    use mercato_core::{BusinessProfile, NewUser, UserRepository, UserRole};

    async fn owner(pool: &SqlitePool, email: &str) -> i64 {
        SqliteUserRepository::new(pool.clone())
            .insert(&NewUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                name: email.to_string(),
                role: UserRole::Freelancer,
            })
            .await
            .unwrap()
            .id
    }

    fn listing(owner_id: i64, name: &str, slug: &str, category: &str) -> NewBusiness {
        NewBusiness {
            owner_id,
            slug: slug.to_string(),
            profile: BusinessProfile {
                name: name.to_string(),
                category: category.to_string(),
                city: Some("Lisbon".to_string()),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_insert_defaults_and_unique_owner() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteBusinessRepository::new(pool.clone());
        let owner_id = owner(&pool, "o@x.co").await;

        let created = repo
            .insert(&listing(owner_id, "Studio", "studio", "design"))
            .await
            .unwrap();
        assert_eq!(created.subscription_tier, SubscriptionTier::Free);
        assert_eq!(created.verification_status, VerificationStatus::Unverified);
        assert_eq!(created.review_count, 0);
        assert!(repo.slug_exists("studio").await.unwrap());

        let err = repo
            .insert(&listing(owner_id, "Second", "second", "design"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_search_filters_are_case_insensitive() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteBusinessRepository::new(pool.clone());
        let a = owner(&pool, "a@x.co").await;
        let b = owner(&pool, "b@x.co").await;
        repo.insert(&listing(a, "Blue Plumbing", "blue", "plumbing"))
            .await
            .unwrap();
        repo.insert(&listing(b, "Red Design", "red", "design"))
            .await
            .unwrap();

        let page = repo
            .search(&BusinessSearch {
                category: Some("PLUMBING".into()),
                city: Some("lisbon".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].slug, "blue");

        let page = repo
            .search(&BusinessSearch {
                q: Some("100%".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_service_crud() {
        let pool = setup_test_database().await.unwrap();
        let businesses = SqliteBusinessRepository::new(pool.clone());
        let services = SqliteServiceRepository::new(pool.clone());
        let owner_id = owner(&pool, "s@x.co").await;
        let business = businesses
            .insert(&listing(owner_id, "Shop", "shop", "retail"))
            .await
            .unwrap();

        let input = ServiceInput {
            name: "Fix".into(),
            price_cents: 1_500,
            ..Default::default()
        };
        let created = services.insert(business.id, &input).await.unwrap();
        let updated = services
            .update(
                created.id,
                &ServiceInput {
                    price_cents: 2_000,
                    ..input
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 2_000);

        services.delete(created.id).await.unwrap();
        assert!(services.list_for_business(business.id).await.unwrap().is_empty());
        assert!(matches!(
            services.delete(created.id).await.unwrap_err(),
            RepositoryError::NotFound(_)
        ));
    }
}
