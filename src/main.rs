#[macro_use]
extern crate rocket;

mod aggregate;
mod auth;
mod config;
mod db;
mod error;
mod export;
mod filter;
mod gateway;
mod models;
mod money;
mod period;
mod screens;

use chrono::{Local, NaiveDate};
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::form::Form;
use rocket::fs::FileServer;
use rocket::http::CookieJar;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::{Build, Rocket, State};
use rocket_dyn_templates::Template;

use auth::{AuthUser, SessionState, MIN_PASSWORD_LEN};
use config::AppConfig;
use db::{DbPool, UserStore};
use error::AppError;
use export::{Download, ReportDocument};
use filter::LedgerFilter;
use models::{CategoryInput, Kind, ProfileUpdate, Status, TransactionInput, User};
use money::{parse_amount_to_cents, Currency};
use period::ReportPeriod;

#[derive(FromForm)]
struct LoginForm {
    email: String,
    password: String,
}

#[derive(FromForm)]
struct TransactionForm {
    description: String,
    amount: String,
    occurred_on: String,
    kind: Option<String>,
    status: Option<String>,
    category_id: Option<String>,
}

fn choice(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_kind(value: Option<&str>) -> Result<Kind, AppError> {
    choice(value)
        .and_then(|value| value.parse::<Kind>().ok())
        .ok_or_else(|| AppError::validation("Tipo inválido"))
}

impl TransactionForm {
    fn into_input(self) -> Result<TransactionInput, AppError> {
        let kind = parse_kind(self.kind.as_deref())?;
        let status = match choice(self.status.as_deref()) {
            None => Status::Completed,
            Some(value) => value
                .parse::<Status>()
                .map_err(|_| AppError::validation("Status inválido"))?,
        };
        let amount_cents = parse_amount_to_cents(&self.amount)
            .ok_or_else(|| AppError::validation("Valor inválido"))?;
        let occurred_on = match parse_date(&self.occurred_on) {
            Some(date) => date,
            None if self.occurred_on.trim().is_empty() => today(),
            None => return Err(AppError::validation("Data inválida")),
        };
        Ok(TransactionInput {
            description: self.description,
            amount_cents,
            occurred_on,
            kind,
            status,
            category_id: self
                .category_id
                .as_deref()
                .and_then(|id| id.trim().parse().ok()),
        })
    }
}

#[derive(FromForm)]
struct LedgerParams {
    kind: Option<String>,
    category: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

impl LedgerParams {
    fn filter(&self) -> LedgerFilter {
        LedgerFilter::from_params(
            self.kind.as_deref(),
            self.category.as_deref(),
            self.start.as_deref(),
            self.end.as_deref(),
        )
    }
}

#[derive(FromForm)]
struct CategoryForm {
    name: String,
    kind: Option<String>,
    color: String,
    icon: Option<String>,
}

impl CategoryForm {
    fn into_input(self) -> Result<CategoryInput, AppError> {
        Ok(CategoryInput {
            kind: parse_kind(self.kind.as_deref())?,
            name: self.name,
            color: self.color,
            icon: self.icon.unwrap_or_default(),
        })
    }
}

#[derive(FromForm)]
struct ProfileForm {
    full_name: String,
    currency: Currency,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn selected_month(month: Option<&str>) -> NaiveDate {
    month
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| parse_date(&format!("{value}-01")))
        .unwrap_or_else(today)
}

fn flash_context(flash: Option<FlashMessage<'_>>) -> serde_json::Value {
    match flash {
        Some(flash) => serde_json::json!({
            "kind": flash.kind(),
            "message": flash.message(),
        }),
        None => serde_json::Value::Null,
    }
}

fn page(name: &'static str, user: &User, flash: Option<FlashMessage<'_>>, view: impl serde::Serialize) -> Template {
    Template::render(
        name,
        serde_json::json!({
            "user": user.email,
            "page": name,
            "flash": flash_context(flash),
            "view": view,
        }),
    )
}

/// Runs `f` against the signed-in user's store.
fn with_store<T>(pool: &DbPool, user: &User, f: impl FnOnce(&UserStore<'_>) -> T) -> Result<T, AppError> {
    let conn = pool.get().map_err(gateway::GatewayError::from)?;
    let store = UserStore::new(&conn, user.id);
    Ok(f(&store))
}

/// Validation problems go back to the form as a flash message. Any other
/// failure is logged and the user lands where they were, nothing changed.
fn redirect_after<T>(result: Result<T, AppError>, to: String) -> Result<Redirect, Flash<Redirect>> {
    match result {
        Ok(_) => Ok(Redirect::to(to)),
        Err(AppError::Validation(message)) => Err(Flash::error(Redirect::to(to), message)),
        Err(err) => {
            log::warn!("write abandoned, redirecting to {to}: {err}");
            Ok(Redirect::to(to))
        }
    }
}

fn render_login(error: Option<&str>, email: &str) -> Template {
    Template::render(
        "login",
        serde_json::json!({
            "error": error,
            "email": email,
            "min_password": MIN_PASSWORD_LEN,
        }),
    )
}

fn sign_in(pool: &DbPool, config: &AppConfig, cookies: &CookieJar<'_>, user_id: i64) -> Result<(), AppError> {
    let conn = pool.get().map_err(gateway::GatewayError::from)?;
    let token = auth::start_session(&conn, user_id, config.max_sessions)
        .map_err(gateway::GatewayError::from)?;
    auth::set_session_cookie(cookies, token);
    Ok(())
}

#[get("/login")]
fn login(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Result<Template, Redirect> {
    if SessionState::resolve(pool, cookies).user().is_some() {
        return Err(Redirect::to("/"));
    }
    Ok(render_login(None, ""))
}

#[post("/login", data = "<form>")]
fn login_post(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    form: Form<LoginForm>,
) -> Result<Redirect, Template> {
    let form = form.into_inner();
    let email = form.email.trim().to_lowercase();
    if email.is_empty() || form.password.is_empty() {
        return Err(render_login(Some("Informe e-mail e senha"), &email));
    }

    let conn = pool
        .get()
        .map_err(|_| render_login(Some("Serviço indisponível, tente novamente"), &email))?;
    let creds = db::user_credentials(&conn, &email)
        .map_err(|_| render_login(Some("Serviço indisponível, tente novamente"), &email))?;
    drop(conn);
    let Some((user_id, hash)) = creds else {
        log::warn!("login rejected for unknown account");
        return Err(render_login(Some("E-mail ou senha inválidos"), &email));
    };
    if !auth::verify_password(&hash, &form.password) {
        log::warn!("login rejected for user {user_id}");
        return Err(render_login(Some("E-mail ou senha inválidos"), &email));
    }

    sign_in(pool, config, cookies, user_id)
        .map_err(|_| render_login(Some("Não foi possível iniciar a sessão"), &email))?;
    Ok(Redirect::to("/"))
}

#[post("/signup", data = "<form>")]
fn signup_post(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    form: Form<LoginForm>,
) -> Result<Redirect, Template> {
    let form = form.into_inner();
    let email = form.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(render_login(Some("Informe um e-mail válido"), &email));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(render_login(
            Some("A senha deve ter pelo menos 6 caracteres"),
            &email,
        ));
    }

    let password_hash = auth::hash_password(&form.password)
        .map_err(|_| render_login(Some("Não foi possível salvar a senha"), &email))?;
    let conn = pool
        .get()
        .map_err(|_| render_login(Some("Serviço indisponível, tente novamente"), &email))?;
    let created_at = Local::now().to_rfc3339();
    let user_id = db::create_account(&conn, &email, &password_hash, &created_at, config.default_currency)
        .map_err(|_| render_login(Some("Este e-mail já está cadastrado"), &email))?;
    drop(conn);
    log::info!("created account {user_id}");

    sign_in(pool, config, cookies, user_id)
        .map_err(|_| render_login(Some("Não foi possível iniciar a sessão"), &email))?;
    Ok(Redirect::to("/"))
}

#[get("/logout")]
fn logout(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Redirect {
    if let Some(cookie) = cookies.get(auth::SESSION_COOKIE) {
        match pool.get() {
            Ok(conn) => {
                if let Err(err) = db::delete_session(&conn, cookie.value()) {
                    log::warn!("failed to delete session: {err}");
                }
            }
            Err(err) => log::warn!("failed to delete session: {err}"),
        }
    }
    auth::clear_session_cookie(cookies);
    Redirect::to("/login")
}

#[get("/?<month>")]
fn dashboard(
    user: AuthUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    month: Option<String>,
) -> Result<Template, AppError> {
    let reference = selected_month(month.as_deref());
    let view = with_store(pool, &user.0, |store| screens::dashboard(store, reference, config))?;
    Ok(page("dashboard", &user.0, None, view))
}

#[get("/transactions?<params..>")]
fn transactions(
    user: AuthUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    flash: Option<FlashMessage<'_>>,
    params: LedgerParams,
) -> Result<Template, AppError> {
    let filter = params.filter();
    let view = with_store(pool, &user.0, |store| screens::ledger(store, &filter, config))?;
    Ok(page("transactions", &user.0, flash, serde_json::json!({
        "ledger": view,
        "today": today().format("%Y-%m-%d").to_string(),
        "statuses": Status::ALL.iter().map(|s| serde_json::json!({
            "value": s.as_str(),
            "label": s.label(),
        })).collect::<Vec<_>>(),
    })))
}

#[get("/transactions/export?<params..>")]
fn export_transactions(
    user: AuthUser,
    pool: &State<DbPool>,
    params: LedgerParams,
) -> Result<Download, AppError> {
    let filter = params.filter();
    let rows = with_store(pool, &user.0, |store| screens::ledger_transactions(store, &filter))?;
    log::info!("exporting {} transactions for user {}", rows.len(), user.0.id);
    let body = export::transactions_csv(&rows)?;
    Ok(Download::csv(today(), body))
}

#[post("/transactions", data = "<form>")]
fn create_transaction(
    user: AuthUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    form: Form<TransactionForm>,
) -> Result<Redirect, Flash<Redirect>> {
    let result = form.into_inner().into_input().and_then(|input| {
        with_store(pool, &user.0, |store| {
            screens::save_transaction(store, None, input, config.enforce_category_kind)
        })?
    });
    redirect_after(result, "/transactions".to_string())
}

#[get("/transactions/<id>/edit")]
fn edit_transaction(
    user: AuthUser,
    pool: &State<DbPool>,
    flash: Option<FlashMessage<'_>>,
    id: i64,
) -> Result<Template, Redirect> {
    let view = with_store(pool, &user.0, |store| screens::edit_transaction(store, id));
    match view {
        Ok(Ok(view)) => Ok(page("transaction_edit", &user.0, flash, serde_json::json!({
            "form": view,
            "statuses": Status::ALL.iter().map(|s| serde_json::json!({
                "value": s.as_str(),
                "label": s.label(),
            })).collect::<Vec<_>>(),
        }))),
        Ok(Err(err)) => {
            log::warn!("cannot edit transaction {id}: {err}");
            Err(Redirect::to("/transactions"))
        }
        Err(err) => {
            log::warn!("cannot edit transaction {id}: {err}");
            Err(Redirect::to("/transactions"))
        }
    }
}

#[post("/transactions/<id>", data = "<form>")]
fn update_transaction(
    user: AuthUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    id: i64,
    form: Form<TransactionForm>,
) -> Result<Redirect, Flash<Redirect>> {
    let result = form.into_inner().into_input().and_then(|input| {
        with_store(pool, &user.0, |store| {
            screens::save_transaction(store, Some(id), input, config.enforce_category_kind)
        })?
    });
    match result {
        Err(AppError::Validation(message)) => Err(Flash::error(
            Redirect::to(format!("/transactions/{id}/edit")),
            message,
        )),
        other => redirect_after(other, "/transactions".to_string()),
    }
}

#[post("/transactions/<id>/delete")]
fn delete_transaction(user: AuthUser, pool: &State<DbPool>, id: i64) -> Result<Redirect, Flash<Redirect>> {
    let result = with_store(pool, &user.0, |store| screens::delete_transaction(store, id))
        .and_then(|inner| inner);
    redirect_after(result, "/transactions".to_string())
}

#[get("/reports?<period>&<start>&<end>")]
fn reports(
    user: AuthUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    period: Option<ReportPeriod>,
    start: Option<String>,
    end: Option<String>,
) -> Result<Template, AppError> {
    let period = period.unwrap_or_default();
    let range = screens::report_range(
        period,
        start.as_deref().and_then(parse_date),
        end.as_deref().and_then(parse_date),
        today(),
    );
    let view = with_store(pool, &user.0, |store| screens::reports(store, period, range, config))?;
    Ok(page("reports", &user.0, None, view))
}

#[get("/reports/export?<period>&<start>&<end>")]
fn export_report(
    user: AuthUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    period: Option<ReportPeriod>,
    start: Option<String>,
    end: Option<String>,
) -> Result<Download, AppError> {
    let range = screens::report_range(
        period.unwrap_or_default(),
        start.as_deref().and_then(parse_date),
        end.as_deref().and_then(parse_date),
        today(),
    );
    let data = with_store(pool, &user.0, |store| screens::load_report(store, range, config))?;
    let document = ReportDocument {
        range,
        totals: data.totals,
        breakdown: &data.breakdown,
        currency: data.currency,
    };
    log::info!("exporting report {} to {} for user {}", range.start, range.end, user.0.id);
    Ok(Download::report(today(), document.render()))
}

#[get("/settings")]
fn settings(
    user: AuthUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    flash: Option<FlashMessage<'_>>,
) -> Result<Template, AppError> {
    let view = with_store(pool, &user.0, |store| screens::settings(store, &user.0.email, config))?;
    Ok(page("settings", &user.0, flash, view))
}

#[post("/settings/profile", data = "<form>")]
fn update_profile(user: AuthUser, pool: &State<DbPool>, form: Form<ProfileForm>) -> Flash<Redirect> {
    let form = form.into_inner();
    let update = ProfileUpdate {
        full_name: form.full_name,
        currency: form.currency,
    };
    let result = with_store(pool, &user.0, |store| screens::update_profile(store, update))
        .and_then(|inner| inner);
    match result {
        Ok(_) => Flash::success(Redirect::to("/settings"), "Perfil atualizado com sucesso!"),
        Err(err) => {
            log::warn!("profile update abandoned: {err}");
            Flash::error(Redirect::to("/settings"), "Não foi possível atualizar o perfil")
        }
    }
}

#[post("/settings/categories", data = "<form>")]
fn create_category(
    user: AuthUser,
    pool: &State<DbPool>,
    form: Form<CategoryForm>,
) -> Result<Redirect, Flash<Redirect>> {
    let result = form.into_inner().into_input().and_then(|input| {
        with_store(pool, &user.0, |store| screens::save_category(store, None, input))?
    });
    redirect_after(result, "/settings".to_string())
}

#[get("/settings/categories/<id>/edit")]
fn edit_category(
    user: AuthUser,
    pool: &State<DbPool>,
    flash: Option<FlashMessage<'_>>,
    id: i64,
) -> Result<Template, Redirect> {
    match with_store(pool, &user.0, |store| screens::edit_category(store, id)) {
        Ok(Ok(view)) => Ok(page("category_edit", &user.0, flash, view)),
        Ok(Err(err)) => {
            log::warn!("cannot edit category {id}: {err}");
            Err(Redirect::to("/settings"))
        }
        Err(err) => {
            log::warn!("cannot edit category {id}: {err}");
            Err(Redirect::to("/settings"))
        }
    }
}

#[post("/settings/categories/<id>", data = "<form>")]
fn update_category(
    user: AuthUser,
    pool: &State<DbPool>,
    id: i64,
    form: Form<CategoryForm>,
) -> Result<Redirect, Flash<Redirect>> {
    let result = form.into_inner().into_input().and_then(|input| {
        with_store(pool, &user.0, |store| screens::save_category(store, Some(id), input))?
    });
    match result {
        Err(AppError::Validation(message)) => Err(Flash::error(
            Redirect::to(format!("/settings/categories/{id}/edit")),
            message,
        )),
        other => redirect_after(other, "/settings".to_string()),
    }
}

#[post("/settings/categories/<id>/delete")]
fn delete_category(user: AuthUser, pool: &State<DbPool>, id: i64) -> Result<Redirect, Flash<Redirect>> {
    let result = with_store(pool, &user.0, |store| screens::delete_category(store, id))
        .and_then(|inner| inner);
    redirect_after(result, "/settings".to_string())
}

#[catch(401)]
fn unauthorized() -> Redirect {
    Redirect::to("/login")
}

#[catch(404)]
fn not_found() -> Redirect {
    Redirect::to("/")
}

fn build(figment: Figment) -> Rocket<Build> {
    let config: AppConfig = figment.extract().expect("app config");
    let pool = db::init_db(&config.database_path).expect("db pool");
    let database_path = config.database_path.clone();

    rocket::custom(figment)
        .manage(pool)
        .manage(config)
        .mount(
            "/",
            routes![
                login,
                login_post,
                signup_post,
                logout,
                dashboard,
                transactions,
                export_transactions,
                create_transaction,
                edit_transaction,
                update_transaction,
                delete_transaction,
                reports,
                export_report,
                settings,
                update_profile,
                create_category,
                edit_category,
                update_category,
                delete_category
            ],
        )
        .register("/", catchers![unauthorized, not_found])
        .mount("/static", FileServer::from("static"))
        .attach(Template::fairing())
        .attach(AdHoc::on_liftoff("Database", move |_| {
            Box::pin(async move {
                log::info!("using database at {}", database_path.display());
            })
        }))
}

#[launch]
fn rocket() -> _ {
    build(rocket::Config::figment())
}
