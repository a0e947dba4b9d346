use diesel::{prelude::*, result::DatabaseErrorKind};
use diesel_async::{
    pooled_connection::{
        mobc::{Builder, Pool},
        AsyncDieselConnectionManager,
    },
    scoped_futures::ScopedFutureExt,
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use std::time::Duration;

pub mod models;
mod schema;
mod sql_functions;

use models::Role;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("getting connection from pool: {0}")]
    GetConnectionPool(#[from] mobc::Error<diesel_async::pooled_connection::PoolError>),
    #[error("result failure: {0}")]
    Result(#[from] diesel::result::Error),
    #[error("Not Found")]
    NotFound,
}

impl Error {
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Result(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            Self::Result(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _
            ))
        )
    }

    pub fn is_check_violation(&self) -> bool {
        matches!(
            self,
            Self::Result(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::CheckViolation,
                _
            ))
        )
    }
}

#[derive(Clone, Debug)]
pub struct Store {
    pool: Pool<AsyncPgConnection>,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    db_url: String,
    max_open: u64,
    max_idle: u64,
    #[serde(with = "humantime_serde", default)]
    max_lifetime: Option<Duration>,
    #[serde(with = "humantime_serde", default)]
    max_idle_lifetime: Option<Duration>,
    #[serde(with = "humantime_serde")]
    timeout_for_get: Duration,
}

/// A photo to attach to a report at creation time. The image payload is
/// opaque to this layer; normalization happens upstream.
pub struct PhotoUpload {
    pub nombre_archivo: Option<String>,
    pub mime: String,
    pub imagen_bytes: Vec<u8>,
    pub comentario: Option<String>,
}

pub async fn create(config: &Config) -> Result<Store, Error> {
    let pool = create_pool(config);
    // Fail fast on an unreachable database rather than at first query.
    let _ = pool.get().await?;
    Ok(Store { pool })
}

fn create_pool(config: &Config) -> mobc::Pool<AsyncDieselConnectionManager<AsyncPgConnection>> {
    let builder = Builder::new()
        .max_open(config.max_open)
        .max_idle(config.max_idle)
        .max_lifetime(
            config
                .max_lifetime
                .map(|v| v.max(Duration::from_secs(3600))),
        )
        .max_idle_lifetime(
            config
                .max_idle_lifetime
                .map(|v| v.max(Duration::from_secs(900))),
        )
        .get_timeout(Some(config.timeout_for_get.max(Duration::from_secs(5))));
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.db_url);
    builder.build(manager)
}

impl Store {
    async fn connection(
        &self,
    ) -> Result<mobc::Connection<AsyncDieselConnectionManager<AsyncPgConnection>>, Error> {
        self.pool.get().await.map_err(Into::into)
    }

    #[tracing::instrument(skip(self, pw_salt, pw_hash))]
    pub async fn create_user(
        &self,
        handle: &str,
        full_name: &str,
        email: Option<String>,
        role: Role,
        pw_salt: Vec<u8>,
        pw_hash: Vec<u8>,
    ) -> Result<models::User, Error> {
        use schema::usuarios;
        let new_user = models::NewUser {
            usuario: handle.trim().to_lowercase(),
            nombre_completo: full_name.trim().to_owned(),
            email,
            rol: role.to_name().to_owned(),
            pw_salt,
            pw_hash,
            activo: true,
            creado_en: jiff::Timestamp::now().into(),
        };
        let mut conn = self.connection().await?;
        diesel::insert_into(usuarios::table)
            .values(new_user)
            .returning(models::User::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_user_by_handle(&self, name: &str) -> Result<Option<models::User>, Error> {
        use schema::usuarios::dsl::*;
        use sql_functions::lower;
        let name = name.trim();
        let mut conn = self.connection().await?;
        match usuarios
            .filter(lower(usuario).eq(lower(name)))
            .select(models::User::as_select())
            .first(&mut conn)
            .await
        {
            Ok(loaded_user) => Ok(Some(loaded_user)),
            Err(diesel::result::Error::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self, user_id))]
    pub async fn load_user_by_id(&self, user_id: i32) -> Result<Option<models::User>, Error> {
        use schema::usuarios::dsl::*;
        let mut conn = self.connection().await?;
        match usuarios
            .filter(id.eq(user_id))
            .select(models::User::as_select())
            .first(&mut conn)
            .await
        {
            Ok(loaded_user) => Ok(Some(loaded_user)),
            Err(diesel::result::Error::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn active_admin_exists(&self) -> Result<bool, Error> {
        use schema::usuarios::dsl::*;
        let mut conn = self.connection().await?;
        let admins: i64 = usuarios
            .filter(rol.eq(Role::Admin.to_name()).and(activo.eq(true)))
            .count()
            .get_result(&mut conn)
            .await?;
        Ok(admins > 0)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_users_with_role(&self, role: Role) -> Result<Vec<models::User>, Error> {
        use schema::usuarios::dsl::*;
        let mut conn = self.connection().await?;
        usuarios
            .filter(rol.eq(role.to_name()).and(activo.eq(true)))
            .order(usuario.asc())
            .select(models::User::as_select())
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_client(&self, name: &str) -> Result<models::Client, Error> {
        use schema::clientes;
        let new_client = models::NewClient {
            nombre: name.trim().to_owned(),
            activo: true,
            creado_en: jiff::Timestamp::now().into(),
        };
        let mut conn = self.connection().await?;
        diesel::insert_into(clientes::table)
            .values(new_client)
            .returning(models::Client::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_active_clients(&self) -> Result<Vec<models::Client>, Error> {
        use schema::clientes::dsl::*;
        let mut conn = self.connection().await?;
        clientes
            .filter(activo.eq(true))
            .order(nombre.asc())
            .select(models::Client::as_select())
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_location(
        &self,
        client_id: i32,
        code: Option<String>,
        name: &str,
        address: Option<String>,
        city: Option<String>,
    ) -> Result<models::Location, Error> {
        use schema::locales;
        let new_location = models::NewLocation {
            cliente_id: client_id,
            codigo_local: code,
            nombre_local: name.trim().to_owned(),
            direccion: address,
            ciudad: city,
            activo: true,
            creado_en: jiff::Timestamp::now().into(),
        };
        let mut conn = self.connection().await?;
        diesel::insert_into(locales::table)
            .values(new_location)
            .returning(models::Location::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_active_locations(
        &self,
    ) -> Result<Vec<(models::Location, models::Client)>, Error> {
        use schema::{clientes, locales};
        let mut conn = self.connection().await?;
        locales::table
            .inner_join(clientes::table)
            .filter(locales::activo.eq(true).and(clientes::activo.eq(true)))
            .order((clientes::nombre.asc(), locales::nombre_local.asc()))
            .select((
                models::Location::as_select(),
                models::Client::as_select(),
            ))
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    /// Idempotent: an already assigned (user, location) pair is left alone.
    /// Returns whether a new assignment row was created.
    #[tracing::instrument(skip(self))]
    pub async fn assign_user_to_location(
        &self,
        user_id: i32,
        location_id: i32,
    ) -> Result<bool, Error> {
        use schema::asignaciones;
        let new_assignment = models::NewAssignment {
            usuario_id: user_id,
            local_id: location_id,
            activo: true,
            asignado_en: jiff::Timestamp::now().into(),
        };
        let mut conn = self.connection().await?;
        let inserted = diesel::insert_into(asignaciones::table)
            .values(new_assignment)
            .on_conflict((asignaciones::usuario_id, asignaciones::local_id))
            .do_nothing()
            .execute(&mut conn)
            .await?;
        Ok(inserted == 1)
    }

    #[tracing::instrument(skip(self))]
    pub async fn locations_assigned_to(
        &self,
        user_id: i32,
    ) -> Result<Vec<(models::Location, models::Client)>, Error> {
        use schema::{asignaciones, clientes, locales};
        let mut conn = self.connection().await?;
        asignaciones::table
            .inner_join(locales::table.inner_join(clientes::table))
            .filter(asignaciones::usuario_id.eq(user_id))
            .filter(
                asignaciones::activo
                    .eq(true)
                    .and(locales::activo.eq(true))
                    .and(clientes::activo.eq(true)),
            )
            .order((clientes::nombre.asc(), locales::nombre_local.asc()))
            .select((
                models::Location::as_select(),
                models::Client::as_select(),
            ))
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    /// Creates the report and all of its photos in a single transaction so
    /// a failed photo insert never leaves a half-filed report behind.
    #[tracing::instrument(skip(self, notas, photos))]
    pub async fn create_report(
        &self,
        location_id: i32,
        user_id: i32,
        visit_date: jiff::civil::Date,
        notas: &str,
        photos: Vec<PhotoUpload>,
    ) -> Result<(models::Report, Vec<models::Photo>), Error> {
        let now: jiff_diesel::Timestamp = jiff::Timestamp::now().into();
        let new_report = models::NewReport {
            local_id: location_id,
            usuario_id: user_id,
            fecha_visita: visit_date.into(),
            notas: notas.trim().to_owned(),
            creado_en: now,
        };
        self.connection()
            .await?
            .transaction(|mut conn| {
                use schema::{fotos, reportes};
                async move {
                    let report = match diesel::insert_into(reportes::table)
                        .values(new_report)
                        .returning(models::Report::as_returning())
                        .get_result(&mut conn)
                        .await
                    {
                        Ok(report) => report,
                        Err(err) => Err(err)?,
                    };
                    let new_photos = photos
                        .into_iter()
                        .map(|photo| models::NewPhoto {
                            reporte_id: report.id,
                            nombre_archivo: photo.nombre_archivo,
                            mime: photo.mime,
                            imagen_bytes: photo.imagen_bytes,
                            comentario: photo.comentario,
                            creado_en: now,
                        })
                        .collect::<Vec<_>>();
                    let saved_photos = if new_photos.is_empty() {
                        Vec::new()
                    } else {
                        match diesel::insert_into(fotos::table)
                            .values(new_photos)
                            .returning(models::Photo::as_returning())
                            .get_results(&mut conn)
                            .await
                        {
                            Ok(saved_photos) => saved_photos,
                            Err(err) => Err(err)?,
                        }
                    };
                    Ok::<_, Error>((report, saved_photos))
                }
                .scope_boxed()
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reports_for_user_between(
        &self,
        user_id: i32,
        desde: jiff::civil::Date,
        hasta: jiff::civil::Date,
    ) -> Result<Vec<(models::Report, models::Location, models::Client)>, Error> {
        use schema::{clientes, locales, reportes};
        let (desde, hasta): (jiff_diesel::Date, jiff_diesel::Date) = (desde.into(), hasta.into());
        let mut conn = self.connection().await?;
        reportes::table
            .inner_join(locales::table.inner_join(clientes::table))
            .filter(reportes::usuario_id.eq(user_id))
            .filter(reportes::fecha_visita.between(desde, hasta))
            .order((reportes::fecha_visita.desc(), reportes::id.desc()))
            .select((
                models::Report::as_select(),
                models::Location::as_select(),
                models::Client::as_select(),
            ))
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn reports_for_client_between(
        &self,
        client_id: i32,
        desde: jiff::civil::Date,
        hasta: jiff::civil::Date,
    ) -> Result<Vec<(models::Report, models::Location, models::User)>, Error> {
        use schema::{locales, reportes, usuarios};
        let (desde, hasta): (jiff_diesel::Date, jiff_diesel::Date) = (desde.into(), hasta.into());
        let mut conn = self.connection().await?;
        reportes::table
            .inner_join(locales::table)
            .inner_join(usuarios::table)
            .filter(locales::cliente_id.eq(client_id))
            .filter(reportes::fecha_visita.between(desde, hasta))
            .order((
                reportes::fecha_visita.asc(),
                locales::nombre_local.asc(),
                reportes::id.asc(),
            ))
            .select((
                models::Report::as_select(),
                models::Location::as_select(),
                models::User::as_select(),
            ))
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn photos_for_report(&self, report_id: i32) -> Result<Vec<models::Photo>, Error> {
        use schema::fotos::dsl::*;
        let mut conn = self.connection().await?;
        fotos
            .filter(reporte_id.eq(report_id))
            .order(id.asc())
            .select(models::Photo::as_select())
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate_user(&self, user_id: i32) -> Result<(), Error> {
        use schema::usuarios::dsl::*;
        let mut conn = self.connection().await?;
        match diesel::update(usuarios.filter(id.eq(user_id)))
            .set(activo.eq(false))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate_client(&self, client_id: i32) -> Result<(), Error> {
        use schema::clientes::dsl::*;
        let mut conn = self.connection().await?;
        match diesel::update(clientes.filter(id.eq(client_id)))
            .set(activo.eq(false))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate_location(&self, location_id: i32) -> Result<(), Error> {
        use schema::locales::dsl::*;
        let mut conn = self.connection().await?;
        match diesel::update(locales.filter(id.eq(location_id)))
            .set(activo.eq(false))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate_assignment(&self, assignment_id: i32) -> Result<(), Error> {
        use schema::asignaciones::dsl::*;
        let mut conn = self.connection().await?;
        match diesel::update(asignaciones.filter(id.eq(assignment_id)))
            .set(activo.eq(false))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the user together with their assignments and authored
    /// reports (and those reports' photos) through the cascades.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, user_id: i32) -> Result<(), Error> {
        use schema::usuarios::dsl::*;
        let mut conn = self.connection().await?;
        match diesel::delete(usuarios.filter(id.eq(user_id)))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the client together with its locations, their reports, and
    /// those reports' photos through the cascades.
    #[tracing::instrument(skip(self))]
    pub async fn delete_client(&self, client_id: i32) -> Result<(), Error> {
        use schema::clientes::dsl::*;
        let mut conn = self.connection().await?;
        match diesel::delete(clientes.filter(id.eq(client_id)))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the report and its photos; the author and location remain.
    #[tracing::instrument(skip(self))]
    pub async fn delete_report(&self, report_id: i32) -> Result<(), Error> {
        use schema::reportes::dsl::*;
        let mut conn = self.connection().await?;
        match diesel::delete(reportes.filter(id.eq(report_id)))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
