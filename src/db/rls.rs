use sqlx::PgConnection;

/// Session setting read by the row-level security policies on admin-only
/// tables and on writes to `cars`. The only anonymous write to `cars` is the
/// `set_car_views` function, which touches nothing but `views`.
pub const CURRENT_ADMIN_SETTING: &str = "app.current_admin";

/// Marks the current transaction as acting on behalf of `admin_id`.
/// Transaction-local: it must be called inside `BEGIN ... COMMIT`.
pub async fn set_current_admin(conn: &mut PgConnection, admin_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT set_config($1, $2, true)")
        .bind(CURRENT_ADMIN_SETTING)
        .bind(admin_id)
        .execute(conn)
        .await?;
    Ok(())
}
