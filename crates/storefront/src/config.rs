//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: <https://pzairsoft.ca>)
//!
//! ## Record store (Knack)
//! - `KNACK_APPLICATION_ID`, `KNACK_REST_API_KEY` - Credentials. Optional at
//!   startup; requests that need the record store fail with 503 without them.
//! - `KNACK_API_BASE` - API root (default: <https://api.knack.com/v1>)
//! - `KNACK_OBJECT_KEY_{PRODUCTS,VARIANTS,ORDERS,USERS,PROMO_CODES}`
//! - `KNACK_FIELD_<OBJECT>_<FIELD>` - Field key overrides
//!
//! ## Notes store (Notion)
//! - `NOTION_API_KEY`, `NOTION_DATABASE_ID_PRODUCTS`, `NOTION_DATABASE_ID_VARIANTS`
//! - `NOTION_API_BASE` (default: <https://api.notion.com/v1>), `NOTION_VERSION` (default: 2022-06-28)
//!
//! ## Catalog
//! - `CATALOG_BACKEND` - `knack` (default) or `notion`
//! - `CATALOG_CACHE_TTL_SECONDS` - Read cache lifetime (default: 120)
//!
//! ## Store
//! - `ADDON_THRESHOLD` - Regular subtotal that unlocks add-on pricing (default: 30.00)
//! - `STORE_PAYEE_EMAIL` - Interac e-Transfer recipient
//! - `ADMIN_EMAILS` - Comma separated admin allow-list
//! - `ALLOWED_ORIGINS` - Comma separated origins for CORS and the add-on listing
//! - `REVALIDATE_TOKEN` - Bearer token for cache revalidation (high entropy)
//! - `RATE_LIMIT_ENABLED` - Per-IP rate limiting (default: true)
//!
//! ## Observability
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://pzairsoft.ca",
    "https://www.pzairsoft.ca",
    "https://protocol-zero.vercel.app",
];

/// Environment lookup used by the loaders. `from_env` passes `std::env::var`.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    pub knack: KnackConfig,
    pub notion: NotionConfig,
    pub catalog: CatalogConfig,
    pub store: StoreConfig,
    /// Bearer token for `POST /api/revalidate`
    pub revalidate_token: Option<SecretString>,
    /// Per-IP rate limiting; only disabled for local tooling and tests
    pub rate_limit: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Which backend serves catalog reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogBackend {
    #[default]
    Knack,
    Notion,
}

impl FromStr for CatalogBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "knack" => Ok(Self::Knack),
            "notion" => Ok(Self::Notion),
            other => Err(format!("unknown catalog backend '{other}' (expected knack or notion)")),
        }
    }
}

/// Catalog source and read cache.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    pub cache_ttl: Duration,
}

/// Business settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Regular subtotal (CAD) at which add-on pricing unlocks
    pub addon_threshold: Decimal,
    /// Interac e-Transfer recipient quoted in payment instructions
    pub payee_email: String,
    /// Admin allow-list, lower-cased
    pub admin_emails: Vec<String>,
    pub allowed_origins: Vec<String>,
}

/// Knack record store configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct KnackConfig {
    pub application_id: Option<String>,
    pub api_key: Option<SecretString>,
    pub api_base: String,
    pub objects: KnackObjects,
    pub fields: KnackFields,
}

impl std::fmt::Debug for KnackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnackConfig")
            .field("application_id", &self.application_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("objects", &self.objects)
            .field("fields", &self.fields)
            .finish()
    }
}

impl KnackConfig {
    /// Both credentials are present.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.application_id.is_some() && self.api_key.is_some()
    }
}

/// Knack object keys.
#[derive(Debug, Clone)]
pub struct KnackObjects {
    pub products: String,
    pub variants: String,
    pub orders: String,
    pub users: String,
    /// Promo codes live in an optional object; lookups return 503 without it.
    pub promo_codes: Option<String>,
}

/// Field keys for every Knack object the storefront reads or writes.
#[derive(Debug, Clone)]
pub struct KnackFields {
    pub products: ProductFields,
    pub variants: VariantFields,
    pub orders: OrderFields,
    pub users: UserFields,
    pub promo_codes: PromoFields,
}

#[derive(Debug, Clone)]
pub struct ProductFields {
    pub id: String,
    pub sku: String,
    pub title: String,
    pub title_original: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub price_cad_base: String,
    pub margin: String,
    pub stock: String,
    pub url: String,
    pub primary_image: String,
    pub images: String,
    pub detail_image: String,
}

#[derive(Debug, Clone)]
pub struct VariantFields {
    /// Connection to the product
    pub product: String,
    pub name: String,
    pub sku: String,
    pub price_cny: String,
    /// Selling price override
    pub price_cad: String,
    pub stock: String,
    pub status: String,
    pub sort_order: String,
    pub option_type_1: String,
    pub option_value_1: String,
    pub option_type_2: String,
    pub option_value_2: String,
    pub total_cost_cad: String,
    pub margin_standard: String,
    pub is_addon: String,
    pub addon_price_cad: String,
    pub addon_cost_cad: String,
    pub addon_margin: String,
    pub min_cart_for_addon: String,
}

#[derive(Debug, Clone)]
pub struct OrderFields {
    pub order_number: String,
    pub user_id: String,
    /// Optional columns: empty when the object has no such field.
    pub user_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: String,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    pub payment_method: String,
    pub payment_status: String,
    pub etransfer_ref: String,
    pub payment_received_at: String,
    pub status: String,
    pub shipping_info: String,
    pub pickup_info: String,
    pub dropoff_info: String,
    pub sourcing_info: String,
    pub status_history: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct UserFields {
    pub display_name: String,
    pub name: String,
    pub user_id: String,
    pub role: String,
    pub email: String,
    pub status: String,
    pub phone: String,
    pub is_active: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct PromoFields {
    pub code: String,
    pub is_active: String,
    pub discount_percent: String,
}

/// Notion notes store configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct NotionConfig {
    pub api_key: Option<SecretString>,
    pub products_database_id: Option<String>,
    pub variants_database_id: Option<String>,
    pub api_base: String,
    pub version: String,
}

impl std::fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("products_database_id", &self.products_database_id)
            .field("variants_database_id", &self.variants_database_id)
            .field("api_base", &self.api_base)
            .field("version", &self.version)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed, or if the
    /// revalidation token fails validation (placeholder detection, entropy
    /// check). Missing vendor credentials are not an error here.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(vars: Lookup<'_>) -> Result<Self, ConfigError> {
        let host = parse_env(vars, "STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env(vars, "STOREFRONT_PORT", "3000")?;
        let base_url = get_env_or_default(vars, "STOREFRONT_BASE_URL", "https://pzairsoft.ca")
            .trim_end_matches('/')
            .to_string();

        let revalidate_token = match get_optional_env(vars, "REVALIDATE_TOKEN") {
            Some(_) => Some(get_validated_secret(vars, "REVALIDATE_TOKEN")?),
            None => None,
        };

        Ok(Self {
            host,
            port,
            knack: KnackConfig::from_lookup(vars),
            notion: NotionConfig::from_lookup(vars),
            catalog: CatalogConfig::from_lookup(vars)?,
            store: StoreConfig::from_lookup(vars, &base_url)?,
            base_url,
            revalidate_token,
            rate_limit: parse_env(vars, "RATE_LIMIT_ENABLED", "true")?,
            sentry_dsn: get_optional_env(vars, "SENTRY_DSN"),
            sentry_environment: get_optional_env(vars, "SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CatalogConfig {
    fn from_lookup(vars: Lookup<'_>) -> Result<Self, ConfigError> {
        let ttl: u64 = parse_env(vars, "CATALOG_CACHE_TTL_SECONDS", "120")?;
        Ok(Self {
            backend: parse_env(vars, "CATALOG_BACKEND", "knack")?,
            cache_ttl: Duration::from_secs(ttl),
        })
    }
}

impl StoreConfig {
    fn from_lookup(vars: Lookup<'_>, base_url: &str) -> Result<Self, ConfigError> {
        let mut allowed_origins = match get_optional_env(vars, "ALLOWED_ORIGINS") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(ToString::to_string).collect(),
        };
        if !base_url.is_empty() && !allowed_origins.iter().any(|o| o == base_url) {
            allowed_origins.push(base_url.to_string());
        }

        Ok(Self {
            addon_threshold: parse_env(vars, "ADDON_THRESHOLD", "30.00")?,
            payee_email: get_env_or_default(vars, "STORE_PAYEE_EMAIL", "protocolzeroairsoft@gmail.com"),
            admin_emails: get_optional_env(vars, "ADMIN_EMAILS")
                .map(|raw| split_list(&raw.to_lowercase()))
                .unwrap_or_default(),
            allowed_origins,
        })
    }
}

impl KnackConfig {
    fn from_lookup(vars: Lookup<'_>) -> Self {
        Self {
            application_id: get_optional_env(vars, "KNACK_APPLICATION_ID"),
            api_key: get_optional_env(vars, "KNACK_REST_API_KEY").map(SecretString::from),
            api_base: get_env_or_default(vars, "KNACK_API_BASE", "https://api.knack.com/v1")
                .trim_end_matches('/')
                .to_string(),
            objects: KnackObjects {
                products: get_env_or_default(vars, "KNACK_OBJECT_KEY_PRODUCTS", "object_6"),
                variants: get_env_or_default(vars, "KNACK_OBJECT_KEY_VARIANTS", "object_7"),
                orders: get_env_or_default(vars, "KNACK_OBJECT_KEY_ORDERS", "object_10"),
                users: get_env_or_default(vars, "KNACK_OBJECT_KEY_USERS", "object_8"),
                promo_codes: get_optional_env(vars, "KNACK_OBJECT_KEY_PROMO_CODES"),
            },
            fields: KnackFields::from_lookup(vars),
        }
    }
}

impl Default for KnackFields {
    fn default() -> Self {
        Self::from_lookup(&|_| None)
    }
}

impl KnackFields {
    #[allow(clippy::too_many_lines)]
    fn from_lookup(vars: Lookup<'_>) -> Self {
        let field = |key: &str, default: &str| get_env_or_default(vars, key, default);
        let optional = |key: &str| get_optional_env(vars, key);

        Self {
            products: ProductFields {
                id: field("KNACK_FIELD_PRODUCTS_ID", "field_45"),
                sku: field("KNACK_FIELD_PRODUCTS_SKU", "field_46"),
                title: field("KNACK_FIELD_PRODUCTS_TITLE", "field_47"),
                title_original: field("KNACK_FIELD_PRODUCTS_TITLE_ORIGINAL", "field_48"),
                description: field("KNACK_FIELD_PRODUCTS_DESCRIPTION", "field_49"),
                category: field("KNACK_FIELD_PRODUCTS_CATEGORY", "field_50"),
                status: field("KNACK_FIELD_PRODUCTS_STATUS", "field_51"),
                price_cad_base: field("KNACK_FIELD_PRODUCTS_PRICE_CAD_BASE", "field_138"),
                margin: field("KNACK_FIELD_PRODUCTS_MARGIN", "field_53"),
                stock: field("KNACK_FIELD_PRODUCTS_STOCK", "field_54"),
                url: field("KNACK_FIELD_PRODUCTS_URL", "field_55"),
                primary_image: field("KNACK_FIELD_PRODUCTS_PRIMARY_IMAGE", "field_56"),
                images: field("KNACK_FIELD_PRODUCTS_IMAGES", "field_57"),
                detail_image: field("KNACK_FIELD_PRODUCTS_DETAIL_IMAGE", "field_58"),
            },
            variants: VariantFields {
                product: field("KNACK_FIELD_VARIANTS_PRODUCT", "field_61"),
                name: field("KNACK_FIELD_VARIANTS_VARIANT_NAME", "field_62"),
                sku: field("KNACK_FIELD_VARIANTS_SKU", "field_63"),
                price_cny: field("KNACK_FIELD_VARIANTS_PRICE_CNY", "field_64"),
                price_cad: field("KNACK_FIELD_VARIANTS_PRICE_CAD", "field_138"),
                stock: field("KNACK_FIELD_VARIANTS_STOCK", "field_66"),
                status: field("KNACK_FIELD_VARIANTS_STATUS", "field_67"),
                sort_order: field("KNACK_FIELD_VARIANTS_SORT_ORDER", "field_68"),
                option_type_1: field("KNACK_FIELD_VARIANTS_OPTION_TYPE_1", "field_145"),
                option_value_1: field("KNACK_FIELD_VARIANTS_OPTION_VALUE_1", "field_146"),
                option_type_2: field("KNACK_FIELD_VARIANTS_OPTION_TYPE_2", "field_147"),
                option_value_2: field("KNACK_FIELD_VARIANTS_OPTION_VALUE_2", "field_148"),
                total_cost_cad: field("KNACK_FIELD_VARIANTS_TOTAL_COST_CAD", "field_153"),
                margin_standard: field("KNACK_FIELD_VARIANTS_MARGIN_STANDARD", "field_154"),
                is_addon: field("KNACK_FIELD_VARIANTS_IS_ADDON_ITEM", "field_158"),
                addon_price_cad: field("KNACK_FIELD_VARIANTS_ADDON_PRICE_CAD", "field_159"),
                addon_cost_cad: field("KNACK_FIELD_VARIANTS_ADDON_COST_CAD", "field_160"),
                addon_margin: field("KNACK_FIELD_VARIANTS_ADDON_MARGIN", "field_161"),
                min_cart_for_addon: field("KNACK_FIELD_VARIANTS_MIN_CART_FOR_ADDON", "field_162"),
            },
            orders: OrderFields {
                order_number: field("KNACK_FIELD_ORDERS_ORDER_NUMBER", "field_94"),
                user_id: field("KNACK_FIELD_ORDERS_USER_ID", "field_95"),
                user_email: optional("KNACK_FIELD_ORDERS_USER_EMAIL"),
                customer_name: optional("KNACK_FIELD_ORDERS_CUSTOMER_NAME"),
                customer_phone: optional("KNACK_FIELD_ORDERS_CUSTOMER_PHONE"),
                items: field("KNACK_FIELD_ORDERS_ITEMS", "field_96"),
                subtotal: field("KNACK_FIELD_ORDERS_SUBTOTAL_CAD", "field_97"),
                shipping: field("KNACK_FIELD_ORDERS_SHIPPING_CAD", "field_98"),
                total: field("KNACK_FIELD_ORDERS_TOTAL_CAD", "field_99"),
                payment_method: field("KNACK_FIELD_ORDERS_PAYMENT_METHOD", "field_100"),
                payment_status: field("KNACK_FIELD_ORDERS_PAYMENT_STATUS", "field_101"),
                etransfer_ref: field("KNACK_FIELD_ORDERS_ETRANSFER_REF", "field_102"),
                payment_received_at: field("KNACK_FIELD_ORDERS_PAYMENT_RECEIVED_AT", "field_103"),
                status: field("KNACK_FIELD_ORDERS_STATUS", "field_104"),
                shipping_info: field("KNACK_FIELD_ORDERS_SHIPPING_INFO", "field_105"),
                pickup_info: field("KNACK_FIELD_ORDERS_PICKUP_INFO", "field_106"),
                dropoff_info: field("KNACK_FIELD_ORDERS_DROPOFF_INFO", "field_107"),
                sourcing_info: field("KNACK_FIELD_ORDERS_TAOBAO_INFO", "field_108"),
                status_history: field("KNACK_FIELD_ORDERS_STATUS_HISTORY", "field_109"),
                created_at: field("KNACK_FIELD_ORDERS_CREATED_AT", "field_110"),
                updated_at: field("KNACK_FIELD_ORDERS_UPDATED_AT", "field_111"),
            },
            users: UserFields {
                display_name: field("KNACK_FIELD_USERS_DISPLAY_NAME", "field_87"),
                name: field("KNACK_FIELD_USERS_NAME", "field_71"),
                user_id: field("KNACK_FIELD_USERS_USER_ID", "field_85"),
                role: field("KNACK_FIELD_USERS_ROLE", "field_90"),
                email: field("KNACK_FIELD_USERS_EMAIL", "field_72"),
                status: field("KNACK_FIELD_USERS_USER_STATUS", "field_74"),
                phone: field("KNACK_FIELD_USERS_PHONE", "field_89"),
                is_active: field("KNACK_FIELD_USERS_IS_ACTIVE", "field_91"),
                created_at: field("KNACK_FIELD_USERS_CREATED_AT", "field_92"),
                updated_at: field("KNACK_FIELD_USERS_UPDATED_AT", "field_93"),
            },
            promo_codes: PromoFields {
                code: field("KNACK_FIELD_PROMO_CODES_CODE", "field_163"),
                is_active: field("KNACK_FIELD_PROMO_CODES_IS_ACTIVE", "field_164"),
                discount_percent: field("KNACK_FIELD_PROMO_CODES_DISCOUNT_PERCENT", "field_165"),
            },
        }
    }
}

impl NotionConfig {
    fn from_lookup(vars: Lookup<'_>) -> Self {
        Self {
            api_key: get_optional_env(vars, "NOTION_API_KEY").map(SecretString::from),
            products_database_id: get_optional_env(vars, "NOTION_DATABASE_ID_PRODUCTS"),
            variants_database_id: get_optional_env(vars, "NOTION_DATABASE_ID_VARIANTS"),
            api_base: get_env_or_default(vars, "NOTION_API_BASE", "https://api.notion.com/v1")
                .trim_end_matches('/')
                .to_string(),
            version: get_env_or_default(vars, "NOTION_VERSION", "2022-06-28"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable. Blank values count as unset.
fn get_optional_env(vars: Lookup<'_>, key: &str) -> Option<String> {
    vars(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get a required variable.
fn get_required_env(vars: Lookup<'_>, key: &str) -> Result<String, ConfigError> {
    get_optional_env(vars, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a variable with a default value.
fn get_env_or_default(vars: Lookup<'_>, key: &str, default: &str) -> String {
    get_optional_env(vars, key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable (or its default) with `FromStr`.
fn parse_env<T>(vars: Lookup<'_>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(vars, key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret.
fn get_validated_secret(vars: Lookup<'_>, key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(vars, key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
