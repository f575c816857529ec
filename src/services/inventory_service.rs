use std::collections::HashMap;
use std::sync::Arc;

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Car;
use crate::repository::CarRepository;
use crate::services::coerce::{non_empty, parse_f64, parse_i32};

/// Half-open price buckets offered by the search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::AsRefStr, strum::EnumIter)]
pub enum PriceRange {
    #[strum(serialize = "under_10k")]
    Under10k,
    #[strum(serialize = "10k_20k")]
    From10kTo20k,
    #[strum(serialize = "20k_30k")]
    From20kTo30k,
    #[strum(serialize = "30k_50k")]
    From30kTo50k,
    #[strum(serialize = "over_50k")]
    Over50k,
}

impl PriceRange {
    /// Inclusive lower bound, exclusive upper bound.
    pub fn bounds(self) -> (f64, Option<f64>) {
        match self {
            Self::Under10k => (0.0, Some(10_000.0)),
            Self::From10kTo20k => (10_000.0, Some(20_000.0)),
            Self::From20kTo30k => (20_000.0, Some(30_000.0)),
            Self::From30kTo50k => (30_000.0, Some(50_000.0)),
            Self::Over50k => (50_000.0, None),
        }
    }

    pub fn contains(self, price: f64) -> bool {
        let (lo, hi) = self.bounds();
        price >= lo && hi.map_or(true, |hi| price < hi)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::AsRefStr, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    MileageAsc,
    YearDesc,
}

impl SortOrder {
    fn order_by(self) -> &'static str {
        match self {
            Self::Newest => " ORDER BY created_at DESC",
            Self::PriceAsc => " ORDER BY price ASC NULLS LAST, created_at DESC",
            Self::PriceDesc => " ORDER BY price DESC NULLS LAST, created_at DESC",
            Self::MileageAsc => " ORDER BY mileage ASC, created_at DESC",
            Self::YearDesc => " ORDER BY model_year DESC, created_at DESC",
        }
    }
}

/// Optional predicates over the `cars` relation. Absent fields impose no
/// constraint; unparsable query values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarFilter {
    pub make: Option<String>,
    pub model: Option<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub price_range: Option<PriceRange>,
    pub min_mileage: Option<i32>,
    pub max_mileage: Option<i32>,
    pub text: Option<String>,
    pub vin: Option<String>,
    pub body_style: Option<String>,
    pub drivetrain: Option<String>,
    pub sort: SortOrder,
    pub limit: Option<i64>,
}

impl CarFilter {
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).map(String::as_str);
        Self {
            make: non_empty(get("make")),
            model: non_empty(get("model")),
            min_year: parse_i32(get("min_year")),
            max_year: parse_i32(get("max_year")),
            min_price: parse_f64(get("min_price")),
            max_price: parse_f64(get("max_price")),
            price_range: get("price_range").and_then(|v| v.trim().parse().ok()),
            min_mileage: parse_i32(get("min_mileage")),
            max_mileage: parse_i32(get("max_mileage")),
            text: non_empty(get("q")),
            vin: non_empty(get("vin")),
            body_style: non_empty(get("body_style")),
            drivetrain: non_empty(get("drivetrain")),
            sort: get("sort")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or_default(),
            limit: None,
        }
    }

    pub fn latest(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    /// Appends `WHERE`, `ORDER BY` and `LIMIT` clauses to a `SELECT ... FROM cars`.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut first = true;

        if let Some(make) = &self.make {
            clause(qb, &mut first, "LOWER(brand) = LOWER(");
            qb.push_bind(make.clone()).push(")");
        }
        if let Some(model) = &self.model {
            clause(qb, &mut first, "LOWER(model) = LOWER(");
            qb.push_bind(model.clone()).push(")");
        }
        if let Some(v) = self.min_year {
            clause(qb, &mut first, "model_year >= ");
            qb.push_bind(v);
        }
        if let Some(v) = self.max_year {
            clause(qb, &mut first, "model_year <= ");
            qb.push_bind(v);
        }
        if let Some(v) = self.min_price {
            clause(qb, &mut first, "price >= ");
            qb.push_bind(v);
        }
        if let Some(v) = self.max_price {
            clause(qb, &mut first, "price <= ");
            qb.push_bind(v);
        }
        if let Some(range) = self.price_range {
            let (lo, hi) = range.bounds();
            clause(qb, &mut first, "price >= ");
            qb.push_bind(lo);
            if let Some(hi) = hi {
                qb.push(" AND price < ").push_bind(hi);
            }
        }
        if let Some(v) = self.min_mileage {
            clause(qb, &mut first, "mileage >= ");
            qb.push_bind(v);
        }
        if let Some(v) = self.max_mileage {
            clause(qb, &mut first, "mileage <= ");
            qb.push_bind(v);
        }
        if let Some(text) = &self.text {
            clause(qb, &mut first, "concat_ws(' ', name, brand, model, \"trim\") ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(text)));
        }
        if let Some(vin) = &self.vin {
            clause(qb, &mut first, "UPPER(vin) = UPPER(");
            qb.push_bind(vin.clone()).push(")");
        }
        if let Some(body_style) = &self.body_style {
            clause(qb, &mut first, "LOWER(body_style) = LOWER(");
            qb.push_bind(body_style.clone()).push(")");
        }
        if let Some(drivetrain) = &self.drivetrain {
            clause(qb, &mut first, "LOWER(drivetrain) = LOWER(");
            qb.push_bind(drivetrain.clone()).push(")");
        }

        qb.push(self.sort.order_by());
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
    }

    /// Same predicates as [`CarFilter::push_sql`], evaluated in memory.
    pub fn matches(&self, car: &Car) -> bool {
        fn eq_ci(expected: &Option<String>, actual: Option<&str>) -> bool {
            match expected {
                Some(e) => actual.is_some_and(|a| a.eq_ignore_ascii_case(e)),
                None => true,
            }
        }
        fn at_least<T: PartialOrd>(min: Option<T>, value: Option<T>) -> bool {
            min.map_or(true, |m| value.is_some_and(|v| v >= m))
        }
        fn at_most<T: PartialOrd>(max: Option<T>, value: Option<T>) -> bool {
            max.map_or(true, |m| value.is_some_and(|v| v <= m))
        }

        let text_matches = self.text.as_ref().map_or(true, |text| {
            let needle = text.to_lowercase();
            [
                Some(car.name.as_str()),
                Some(car.brand.as_str()),
                Some(car.model.as_str()),
                car.trim.as_deref(),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
            .contains(&needle)
        });

        eq_ci(&self.make, Some(car.brand.as_str()))
            && eq_ci(&self.model, Some(car.model.as_str()))
            && at_least(self.min_year, Some(car.model_year))
            && at_most(self.max_year, Some(car.model_year))
            && at_least(self.min_price, car.price)
            && at_most(self.max_price, car.price)
            && self
                .price_range
                .map_or(true, |r| car.price.is_some_and(|p| r.contains(p)))
            && at_least(self.min_mileage, Some(car.mileage))
            && at_most(self.max_mileage, Some(car.mileage))
            && text_matches
            && eq_ci(&self.vin, Some(car.vin.as_str()))
            && eq_ci(&self.body_style, car.body_style.as_deref())
            && eq_ci(&self.drivetrain, car.drivetrain.as_deref())
    }

    /// In-memory counterpart of the `ORDER BY` / `LIMIT` clauses.
    pub fn sort_and_limit(&self, cars: &mut Vec<Car>) {
        use std::cmp::Ordering;
        let price_nulls_last = |a: Option<f64>, b: Option<f64>, desc: bool| match (a, b) {
            (Some(a), Some(b)) if desc => b.total_cmp(&a),
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        cars.sort_by(|a, b| {
            let primary = match self.sort {
                SortOrder::Newest => Ordering::Equal,
                SortOrder::PriceAsc => price_nulls_last(a.price, b.price, false),
                SortOrder::PriceDesc => price_nulls_last(a.price, b.price, true),
                SortOrder::MileageAsc => a.mileage.cmp(&b.mileage),
                SortOrder::YearDesc => b.model_year.cmp(&a.model_year),
            };
            primary.then(b.created_at.cmp(&a.created_at))
        });
        if let Some(limit) = self.limit {
            cars.truncate(usize::try_from(limit).unwrap_or(0));
        }
    }
}

fn clause(qb: &mut QueryBuilder<'_, Postgres>, first: &mut bool, sql: &str) {
    qb.push(if *first { " WHERE " } else { " AND " });
    qb.push(sql);
    *first = false;
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct InventoryService {
    cars: Arc<dyn CarRepository>,
}

impl InventoryService {
    pub fn new(cars: Arc<dyn CarRepository>) -> Self {
        Self { cars }
    }

    /// Query failures are logged and reported as an empty result.
    pub async fn search(&self, filter: &CarFilter) -> Vec<Car> {
        match self.cars.search(filter).await {
            Ok(cars) => {
                tracing::debug!("Inventory search: filter={:?}, results={}", filter, cars.len());
                cars
            }
            Err(e) => {
                tracing::error!("Inventory search failed: filter={:?}, error={}", filter, e);
                Vec::new()
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Option<Car>> {
        self.cars.find(id).await
    }

    /// Read-then-write increment with no atomicity: two concurrent views of
    /// the same car can both read N and both write N + 1.
    pub async fn record_view(&self, id: Uuid) -> AppResult<Option<i64>> {
        let Some(current) = self.cars.view_count(id).await? else {
            return Ok(None);
        };
        let next = current + 1;
        self.cars.set_view_count(id, next).await?;
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::middleware::AuthenticatedAdmin;
    use crate::models::{CarStatus, NewCar};
    use crate::repository::memory::{sample_car, MemoryStore};
    use async_trait::async_trait;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn store_with_prices(prices: &[Option<f64>]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (i, price) in prices.iter().enumerate() {
            let mut car = sample_car("Honda", "Civic", 2018 + i as i32);
            car.price = *price;
            store.put_car(car).await;
        }
        store
    }

    #[test]
    fn test_from_query_ignores_unparsable_values() {
        let filter = CarFilter::from_query(&params(&[
            ("make", "Toyota"),
            ("min_year", "abc"),
            ("max_price", "25,000"),
            ("price_range", "bogus"),
            ("q", "  "),
            ("sort", "price_desc"),
        ]));
        assert_eq!(filter.make.as_deref(), Some("Toyota"));
        assert_eq!(filter.min_year, None);
        assert_eq!(filter.max_price, Some(25000.0));
        assert_eq!(filter.price_range, None);
        assert_eq!(filter.text, None);
        assert_eq!(filter.sort, SortOrder::PriceDesc);
    }

    #[test]
    fn test_price_range_is_half_open() {
        let range: PriceRange = "10k_20k".parse().unwrap();
        assert!(range.contains(10_000.0));
        assert!(range.contains(19_999.99));
        assert!(!range.contains(20_000.0));
        assert!(!range.contains(9_999.0));
        assert!(PriceRange::Over50k.contains(1_000_000.0));
    }

    #[test]
    fn test_push_sql_binds_every_present_filter() {
        let filter = CarFilter::from_query(&params(&[
            ("make", "Ford"),
            ("price_range", "10k_20k"),
            ("q", "50%"),
            ("sort", "mileage_asc"),
        ]));
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM cars");
        filter.push_sql(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM cars WHERE LOWER(brand) = LOWER($1) AND price >= $2 AND price < $3 \
             AND concat_ws(' ', name, brand, model, \"trim\") ILIKE $4 \
             ORDER BY mileage ASC, created_at DESC"
        );
    }

    #[test]
    fn test_empty_filter_has_no_where_clause() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM cars");
        CarFilter::latest(6).push_sql(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM cars ORDER BY created_at DESC LIMIT $1"
        );
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_matches_text_and_case_insensitive_equality() {
        let car = sample_car("Toyota", "RAV4", 2020);
        let hit = CarFilter {
            make: Some("toyota".into()),
            text: Some("rav".into()),
            ..Default::default()
        };
        assert!(hit.matches(&car));
        let miss = CarFilter {
            drivetrain: Some("FWD".into()),
            ..Default::default()
        };
        assert!(!miss.matches(&car));
    }

    #[tokio::test]
    async fn test_price_range_10k_20k_returns_only_cars_in_range() {
        let store = store_with_prices(&[
            Some(9_999.0),
            Some(10_000.0),
            Some(15_500.0),
            Some(20_000.0),
            None,
            Some(35_000.0),
        ])
        .await;
        let service = InventoryService::new(store);

        let filter = CarFilter::from_query(&params(&[("price_range", "10k_20k")]));
        let cars = service.search(&filter).await;

        let mut prices: Vec<f64> = cars.iter().filter_map(|c| c.price).collect();
        prices.sort_by(f64::total_cmp);
        assert_eq!(prices, vec![10_000.0, 15_500.0]);
        assert_eq!(cars.len(), 2);
    }

    #[tokio::test]
    async fn test_absent_filters_return_everything() {
        let store = store_with_prices(&[Some(1.0), None, Some(3.0)]).await;
        let service = InventoryService::new(store);
        assert_eq!(service.search(&CarFilter::default()).await.len(), 3);
    }

    struct BrokenCars;

    #[async_trait]
    impl CarRepository for BrokenCars {
        async fn search(&self, _: &CarFilter) -> AppResult<Vec<Car>> {
            Err(AppError::Internal("connection reset".into()))
        }
        async fn find(&self, _: Uuid) -> AppResult<Option<Car>> {
            Err(AppError::Internal("connection reset".into()))
        }
        async fn view_count(&self, _: Uuid) -> AppResult<Option<i64>> {
            Err(AppError::Internal("connection reset".into()))
        }
        async fn set_view_count(&self, _: Uuid, _: i64) -> AppResult<()> {
            Err(AppError::Internal("connection reset".into()))
        }
        async fn insert_car(&self, _: &AuthenticatedAdmin, _: NewCar) -> AppResult<Car> {
            Err(AppError::Internal("connection reset".into()))
        }
        async fn delete_car(&self, _: &AuthenticatedAdmin, _: Uuid) -> AppResult<bool> {
            Err(AppError::Internal("connection reset".into()))
        }
        async fn set_car_status(
            &self,
            _: &AuthenticatedAdmin,
            _: Uuid,
            _: CarStatus,
        ) -> AppResult<bool> {
            Err(AppError::Internal("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_search_failure_reads_as_no_results() {
        let service = InventoryService::new(Arc::new(BrokenCars));
        assert!(service.search(&CarFilter::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_record_view_increments() {
        let store = Arc::new(MemoryStore::new());
        let car = sample_car("Mazda", "CX-5", 2021);
        let id = car.id;
        store.put_car(car).await;
        let service = InventoryService::new(store);

        assert_eq!(service.record_view(id).await.unwrap(), Some(1));
        assert_eq!(service.record_view(id).await.unwrap(), Some(2));
        assert_eq!(service.record_view(Uuid::new_v4()).await.unwrap(), None);
    }

    /// Holds each view-count read until two readers have arrived, so both
    /// increments start from the same value.
    struct PausedReads {
        inner: Arc<MemoryStore>,
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl CarRepository for PausedReads {
        async fn search(&self, filter: &CarFilter) -> AppResult<Vec<Car>> {
            self.inner.search(filter).await
        }
        async fn find(&self, id: Uuid) -> AppResult<Option<Car>> {
            self.inner.find(id).await
        }
        async fn view_count(&self, id: Uuid) -> AppResult<Option<i64>> {
            let views = self.inner.view_count(id).await;
            self.barrier.wait().await;
            views
        }
        async fn set_view_count(&self, id: Uuid, views: i64) -> AppResult<()> {
            self.inner.set_view_count(id, views).await
        }
        async fn insert_car(&self, admin: &AuthenticatedAdmin, car: NewCar) -> AppResult<Car> {
            self.inner.insert_car(admin, car).await
        }
        async fn delete_car(&self, admin: &AuthenticatedAdmin, id: Uuid) -> AppResult<bool> {
            self.inner.delete_car(admin, id).await
        }
        async fn set_car_status(
            &self,
            admin: &AuthenticatedAdmin,
            id: Uuid,
            status: CarStatus,
        ) -> AppResult<bool> {
            self.inner.set_car_status(admin, id, status).await
        }
    }

    #[tokio::test]
    async fn test_interleaved_views_can_lose_an_update() {
        let store = Arc::new(MemoryStore::new());
        let car = sample_car("Mazda", "CX-5", 2021);
        let id = car.id;
        store.put_car(car).await;
        let service = InventoryService::new(Arc::new(PausedReads {
            inner: store.clone(),
            barrier: tokio::sync::Barrier::new(2),
        }));

        let (first, second) = tokio::join!(service.record_view(id), service.record_view(id));

        assert_eq!(first.unwrap(), Some(1));
        assert_eq!(second.unwrap(), Some(1));
        assert_eq!(store.view_count(id).await.unwrap(), Some(1));
    }
}
