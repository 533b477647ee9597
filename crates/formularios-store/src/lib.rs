//! Typed persistence for companies, users and submitted forms.
//!
//! Every function takes a borrowed [`rusqlite::Connection`] and runs one
//! statement (or one statement per row for grouped reads). Pooling, threads
//! and transactions are the caller's concern; nothing here retries.
//!
//! JSON columns are never handed out as raw text: they are decoded into
//! [`DatosFormulario`] and [`DatosSubformulario`] on the way out and encoded
//! from them on the way in.

mod documents;
mod empresas;
mod error;
mod formularios;
mod usuarios;

pub use documents::{Campos, DatosFormulario, DatosSubformulario, Encabezado};
pub use empresas::{find_empresa_id, list_empresas, Empresa};
pub use error::StoreError;
pub use formularios::{
    find_filtrados, get_formulario, insert_formulario, insert_subformulario, list_subformularios,
    FormularioConSubformularios, FormularioPrincipal, FormularioResumen, NewFormulario,
    Subformularios,
};
pub use usuarios::{find_by_credentials, register_usuario, NewUsuario, Usuario, DEFAULT_ROL};

#[cfg(test)]
mod tests;
