//! Locale handling for the public site.
//!
//! Every page lives under a locale prefix (`/en/...`, `/es/...`). This module
//! owns the supported locale list, `Accept-Language` negotiation, the path
//! rewrite used by the language toggle, and a small message catalog.

use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Es];

impl Locale {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }

    /// Exact match against a path segment (`es`, not `es-MX`).
    pub fn from_segment(segment: &str) -> Option<Self> {
        SUPPORTED_LOCALES.iter().copied().find(|l| l.as_str() == segment)
    }

    /// Parses a locale tag, tolerating region suffixes (`es-MX`, `en_US`).
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        let lang = normalized.split(['-', '_']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            _ => None,
        }
    }

    /// The locale offered by the language toggle.
    pub const fn other(self) -> Self {
        match self {
            Self::En => Self::Es,
            Self::Es => Self::En,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the best supported locale from an `Accept-Language` header value.
///
/// Entries are ranked by their `q` weight (default 1.0); ties keep header
/// order. Entries with `q=0` are ignored.
pub fn negotiate(accept_language: Option<&str>) -> Option<Locale> {
    let header = accept_language?;
    let mut ranked: Vec<(f32, usize, Locale)> = header
        .split(',')
        .enumerate()
        .filter_map(|(idx, entry)| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            let locale = Locale::parse(tag)?;
            let q = parts
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            (q > 0.0).then_some((q, idx, locale))
        })
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    ranked.first().map(|(_, _, locale)| *locale)
}

/// Returns the locale named by the first path segment, if any.
pub fn locale_from_path(path: &str) -> Option<Locale> {
    let first = path.trim_start_matches('/').split('/').next()?;
    Locale::from_segment(first)
}

/// Strips a leading locale segment: `/es/cars/1` -> `/cars/1`, `/en` -> `/`.
pub fn strip_locale(path: &str) -> &str {
    match locale_from_path(path) {
        Some(locale) => {
            let rest = &path.trim_start_matches('/')[locale.as_str().len()..];
            if rest.is_empty() {
                "/"
            } else {
                rest
            }
        }
        None => path,
    }
}

/// Prefixes a locale-less path and query with `locale`.
pub fn localized_path(locale: Locale, path_and_query: &str) -> String {
    let (path, query) = split_query(path_and_query);
    let path = if path == "/" || path.is_empty() {
        String::new()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    match query {
        Some(q) => format!("/{}{}?{}", locale, path, q),
        None => format!("/{}{}", locale, path),
    }
}

/// Rewrites only the locale segment of `path_and_query`, keeping the rest of
/// the path and the query string. Paths without a locale get one prepended.
pub fn switch_locale(path_and_query: &str, target: Locale) -> String {
    let (path, query) = split_query(path_and_query);
    localized_path(
        target,
        &match query {
            Some(q) => format!("{}?{}", strip_locale(path), q),
            None => strip_locale(path).to_string(),
        },
    )
}

fn split_query(path_and_query: &str) -> (&str, Option<&str>) {
    match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query).filter(|q| !q.is_empty())),
        None => (path_and_query, None),
    }
}

static CATALOG: &[(&str, &str, &str)] = &[
    ("nav.home", "Home", "Inicio"),
    ("nav.inventory", "Inventory", "Inventario"),
    ("nav.contact", "Contact", "Contacto"),
    ("nav.pre_approval", "Get Pre-Approved", "Pre-aprobación"),
    ("nav.admin", "Admin", "Administración"),
    ("home.title", "Quality used cars", "Autos usados de calidad"),
    ("home.latest", "Latest arrivals", "Recién llegados"),
    ("search.title", "Search inventory", "Buscar inventario"),
    ("search.make", "Make", "Marca"),
    ("search.model", "Model", "Modelo"),
    ("search.price", "Price", "Precio"),
    ("search.any", "Any", "Cualquiera"),
    ("search.submit", "Search", "Buscar"),
    ("search.keyword", "Keyword", "Palabra clave"),
    ("search.min_year", "Min year", "Año mínimo"),
    ("search.max_year", "Max year", "Año máximo"),
    ("search.max_mileage", "Max mileage", "Kilometraje máximo"),
    ("search.sort", "Sort by", "Ordenar por"),
    ("search.results", "vehicles found", "vehículos encontrados"),
    ("search.reset", "Clear filters", "Borrar filtros"),
    ("price_range.under_10k", "Under $10,000", "Menos de $10,000"),
    ("price_range.10k_20k", "$10,000 - $20,000", "$10,000 - $20,000"),
    ("price_range.20k_30k", "$20,000 - $30,000", "$20,000 - $30,000"),
    ("price_range.30k_50k", "$30,000 - $50,000", "$30,000 - $50,000"),
    ("price_range.over_50k", "Over $50,000", "Más de $50,000"),
    ("sort.newest", "Newest arrivals", "Más recientes"),
    ("sort.price_asc", "Price: low to high", "Precio: menor a mayor"),
    ("sort.price_desc", "Price: high to low", "Precio: mayor a menor"),
    ("sort.mileage_asc", "Lowest mileage", "Menor kilometraje"),
    ("sort.year_desc", "Newest model year", "Año más reciente"),
    ("search.empty", "No cars match your search.", "Ningún auto coincide con su búsqueda."),
    ("car.year", "Year", "Año"),
    ("car.mileage", "Mileage", "Kilometraje"),
    ("car.price", "Price", "Precio"),
    ("car.call_for_price", "Call for price", "Llame para precio"),
    ("car.vin", "VIN", "VIN"),
    ("car.trim", "Trim", "Versión"),
    ("car.stock", "Stock #", "N.º de inventario"),
    ("car.spec_sheet", "Vehicle spec sheet", "Ficha técnica del vehículo"),
    ("car.body_style", "Body style", "Carrocería"),
    ("car.drivetrain", "Drivetrain", "Tracción"),
    ("car.cylinders", "Cylinders", "Cilindros"),
    ("car.status", "Status", "Estado"),
    ("car.views", "Views", "Vistas"),
    ("car.inquire", "Inquire about this car", "Consultar por este auto"),
    ("car.download_pdf", "Download spec sheet", "Descargar ficha técnica"),
    ("car.back", "Back to inventory", "Volver al inventario"),
    ("car.apply", "Apply for financing", "Solicitar financiamiento"),
    ("status.available", "Available", "Disponible"),
    ("status.sold", "Sold", "Vendido"),
    ("status.pending", "Pending", "Pendiente"),
    ("status.approved", "Approved", "Aprobada"),
    ("status.rejected", "Rejected", "Rechazada"),
    ("not_found.title", "Page not found", "Página no encontrada"),
    ("not_found.body", "We couldn't find what you were looking for.", "No encontramos lo que buscaba."),
    ("form.name", "Name", "Nombre"),
    ("form.email", "Email", "Correo electrónico"),
    ("form.phone", "Phone", "Teléfono"),
    ("form.message", "Message", "Mensaje"),
    ("form.send", "Send", "Enviar"),
    ("form.success", "Thank you! We will be in touch shortly.", "¡Gracias! Nos pondremos en contacto pronto."),
    ("contact.title", "Contact us", "Contáctenos"),
    ("pre_approval.title", "Get pre-approved", "Obtenga su pre-aprobación"),
    ("pre_approval.intro", "It only takes a few minutes and won't affect your credit score.", "Solo toma unos minutos y no afecta su historial crediticio."),
    ("pre_approval.step_personal", "Personal information", "Información personal"),
    ("pre_approval.step_housing", "Housing", "Vivienda"),
    ("pre_approval.step_employment", "Employment and income", "Empleo e ingresos"),
    ("pre_approval.step_vehicle", "Vehicle and down payment", "Vehículo y enganche"),
    ("pre_approval.first_name", "First name", "Nombre"),
    ("pre_approval.last_name", "Last name", "Apellido"),
    ("pre_approval.ssn", "Social Security number", "Número de Seguro Social"),
    ("pre_approval.date_of_birth", "Date of birth", "Fecha de nacimiento"),
    ("pre_approval.address", "Street address", "Dirección"),
    ("pre_approval.city", "City", "Ciudad"),
    ("pre_approval.state", "State", "Estado"),
    ("pre_approval.zip_code", "ZIP code", "Código postal"),
    ("pre_approval.housing_status", "Do you rent or own?", "¿Renta o es propietario?"),
    ("pre_approval.rent", "Rent", "Renta"),
    ("pre_approval.own", "Own", "Propietario"),
    ("pre_approval.other", "Other", "Otro"),
    ("pre_approval.monthly_housing_payment", "Monthly housing payment", "Pago mensual de vivienda"),
    ("pre_approval.years_at_address", "Years at address", "Años en el domicilio"),
    ("pre_approval.employment_status", "Employment status", "Situación laboral"),
    ("pre_approval.employed", "Employed", "Empleado"),
    ("pre_approval.self_employed", "Self-employed", "Trabajador independiente"),
    ("pre_approval.retired", "Retired", "Jubilado"),
    ("pre_approval.employer_name", "Employer", "Empleador"),
    ("pre_approval.job_title", "Job title", "Puesto"),
    ("pre_approval.years_employed", "Years employed", "Años de empleo"),
    ("pre_approval.monthly_income", "Monthly income", "Ingreso mensual"),
    ("pre_approval.additional_income", "Additional monthly income", "Ingreso mensual adicional"),
    ("pre_approval.vehicle", "Vehicle of interest", "Vehículo de interés"),
    ("pre_approval.down_payment", "Down payment", "Enganche"),
    ("pre_approval.required", "Please fill in the required fields.", "Complete los campos obligatorios."),
    ("pre_approval.next", "Next", "Siguiente"),
    ("pre_approval.back", "Back", "Atrás"),
    ("pre_approval.submit", "Submit application", "Enviar solicitud"),
    ("pre_approval.success", "Application received", "Solicitud recibida"),
    ("pre_approval.reference", "Your reference number", "Su número de referencia"),
    ("admin.login", "Sign in", "Iniciar sesión"),
    ("admin.password", "Password", "Contraseña"),
    ("admin.logout", "Sign out", "Cerrar sesión"),
    ("admin.dashboard", "Dashboard", "Panel"),
    ("admin.add_car", "Add car", "Agregar auto"),
    ("admin.delete", "Delete", "Eliminar"),
    ("admin.cars", "Inventory", "Inventario"),
    ("admin.images", "Photos", "Fotos"),
    ("admin.save", "Save", "Guardar"),
    ("admin.update", "Update", "Actualizar"),
    ("admin.confirm_delete", "Delete this car?", "¿Eliminar este auto?"),
    ("admin.reference", "Reference", "Referencia"),
    ("admin.date", "Date", "Fecha"),
    ("admin.car_added", "Car added", "Auto agregado"),
    ("admin.car_deleted", "Car deleted", "Auto eliminado"),
    ("admin.status_updated", "Status updated", "Estado actualizado"),
    ("admin.signed_in_as", "Signed in as", "Sesión iniciada como"),
    ("admin.enquiries", "Enquiries", "Consultas"),
    ("admin.applications", "Applications", "Solicitudes"),
];

/// Looks up a message. Missing keys fall back to the key itself.
pub fn t(locale: Locale, key: &str) -> &str {
    CATALOG
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, en, es)| match locale {
            Locale::En => *en,
            Locale::Es => *es,
        })
        .unwrap_or(key)
}

/// The whole catalog for one locale, for template contexts.
pub fn messages(locale: Locale) -> std::collections::HashMap<&'static str, &'static str> {
    CATALOG
        .iter()
        .map(|(k, en, es)| (*k, if locale == Locale::Es { *es } else { *en }))
        .collect()
}
