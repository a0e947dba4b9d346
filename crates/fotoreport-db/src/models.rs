use diesel::prelude::*;

/// The closed set of user roles admitted by the `usuarios.rol` check constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Worker,
}

impl Role {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Self::Admin),
            "worker" => Some(Self::Worker),
            _ => None,
        }
    }

    pub fn to_name(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Worker => "worker",
        }
    }
}

#[derive(Debug, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::usuarios)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub usuario: String,
    pub nombre_completo: String,
    pub email: Option<String>,
    pub rol: String,
    pub pw_salt: Vec<u8>,
    pub pw_hash: Vec<u8>,
    pub activo: bool,
    pub creado_en: jiff_diesel::Timestamp,
}

impl User {
    /// `None` only if the stored value escaped the check constraint.
    pub fn role(&self) -> Option<Role> {
        Role::from_name(&self.rol)
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::usuarios)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser {
    pub usuario: String,
    pub nombre_completo: String,
    pub email: Option<String>,
    pub rol: String,
    pub pw_salt: Vec<u8>,
    pub pw_hash: Vec<u8>,
    pub activo: bool,
    pub creado_en: jiff_diesel::Timestamp,
}

#[derive(Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::clientes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Client {
    pub id: i32,
    pub nombre: String,
    pub activo: bool,
    pub creado_en: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::clientes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewClient {
    pub nombre: String,
    pub activo: bool,
    pub creado_en: jiff_diesel::Timestamp,
}

#[derive(Debug, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::locales)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(Client, foreign_key = cliente_id))]
pub struct Location {
    pub id: i32,
    pub cliente_id: i32,
    pub codigo_local: Option<String>,
    pub nombre_local: String,
    pub direccion: Option<String>,
    pub ciudad: Option<String>,
    pub activo: bool,
    pub creado_en: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::locales)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewLocation {
    pub cliente_id: i32,
    pub codigo_local: Option<String>,
    pub nombre_local: String,
    pub direccion: Option<String>,
    pub ciudad: Option<String>,
    pub activo: bool,
    pub creado_en: jiff_diesel::Timestamp,
}

#[derive(Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::asignaciones)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(User, foreign_key = usuario_id))]
#[diesel(belongs_to(Location, foreign_key = local_id))]
pub struct Assignment {
    pub id: i32,
    pub usuario_id: i32,
    pub local_id: i32,
    pub activo: bool,
    pub asignado_en: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::asignaciones)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAssignment {
    pub usuario_id: i32,
    pub local_id: i32,
    pub activo: bool,
    pub asignado_en: jiff_diesel::Timestamp,
}

#[derive(Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::reportes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(User, foreign_key = usuario_id))]
#[diesel(belongs_to(Location, foreign_key = local_id))]
pub struct Report {
    pub id: i32,
    pub local_id: i32,
    pub usuario_id: i32,
    pub fecha_visita: jiff_diesel::Date,
    pub notas: String,
    pub creado_en: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::reportes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewReport {
    pub local_id: i32,
    pub usuario_id: i32,
    pub fecha_visita: jiff_diesel::Date,
    pub notas: String,
    pub creado_en: jiff_diesel::Timestamp,
}

#[derive(Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::fotos)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(Report, foreign_key = reporte_id))]
pub struct Photo {
    pub id: i32,
    pub reporte_id: i32,
    pub nombre_archivo: Option<String>,
    pub mime: String,
    pub imagen_bytes: Vec<u8>,
    pub comentario: Option<String>,
    pub creado_en: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::fotos)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPhoto {
    pub reporte_id: i32,
    pub nombre_archivo: Option<String>,
    pub mime: String,
    pub imagen_bytes: Vec<u8>,
    pub comentario: Option<String>,
    pub creado_en: jiff_diesel::Timestamp,
}
