//! Unit tests for the persistence layer.

use rusqlite::Connection;
use serde_json::json;

use crate::documents::{Campos, DatosFormulario, DatosSubformulario, Encabezado};
use crate::empresas::{find_empresa_id, list_empresas};
use crate::error::StoreError;
use crate::formularios::{
    find_filtrados, get_formulario, group_rows, insert_formulario, insert_subformulario,
    list_subformularios, JoinedRow, NewFormulario,
};
use crate::usuarios::{find_by_credentials, register_usuario, NewUsuario, DEFAULT_ROL};

/// Creates an in-memory SQLite database with the schema applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("should enable foreign keys");
    formularios_db::bootstrap_schema(&conn).expect("schema bootstrap should succeed");
    conn
}

/// Inserts a company and returns its id.
fn seed_empresa(conn: &Connection, nombre: &str) -> i64 {
    conn.execute("INSERT INTO empresas (nombre_empresa) VALUES (?1)", [nombre])
        .expect("should insert empresa");
    conn.last_insert_rowid()
}

fn seed_usuario(conn: &Connection) -> i64 {
    register_usuario(
        conn,
        &NewUsuario {
            nombre_usuario: Some("operario"),
            password: Some("clave"),
            rol: DEFAULT_ROL,
        },
    )
    .expect("should insert usuario")
}

fn datos_con_fecha(fecha: &str) -> DatosFormulario {
    DatosFormulario {
        encabezado: Encabezado {
            fecha: fecha.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn sub_con_campo(clave: &str, valor: &str) -> DatosSubformulario {
    let mut campos = Campos::new();
    campos.insert(clave.to_string(), json!(valor));
    DatosSubformulario {
        campos,
        ..Default::default()
    }
}

fn save(conn: &Connection, empresa_id: i64, usuario_id: i64, fecha: &str) -> i64 {
    insert_formulario(
        conn,
        &NewFormulario {
            empresa_id,
            usuario_id,
            tipo_formulario_id: 1,
            fecha_completado: Some("2024-05-02 10:00:00".to_string()),
            datos: datos_con_fecha(fecha),
        },
    )
    .expect("should insert formulario")
}

// ── empresas ─────────────────────────────────────────────────────────

#[test]
fn list_empresas_returns_all_rows() {
    let conn = test_db();
    let a = seed_empresa(&conn, "Constructora Sur");
    let b = seed_empresa(&conn, "Áridos del Norte");

    let empresas = list_empresas(&conn).expect("should list");
    let ids: Vec<i64> = empresas.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![a, b]);
    assert_eq!(empresas[1].nombre_empresa, "Áridos del Norte");
}

#[test]
fn find_empresa_id_is_exact_match() {
    let conn = test_db();
    let id = seed_empresa(&conn, "Constructora Sur");

    assert_eq!(find_empresa_id(&conn, "Constructora Sur").unwrap(), Some(id));
    assert_eq!(find_empresa_id(&conn, "Constructora").unwrap(), None);
}

// ── usuarios ─────────────────────────────────────────────────────────

#[test]
fn credentials_must_match_exactly() {
    let conn = test_db();
    let id = register_usuario(
        &conn,
        &NewUsuario {
            nombre_usuario: Some("alice"),
            password: Some("s3creto"),
            rol: "admin",
        },
    )
    .unwrap();

    let usuario = find_by_credentials(&conn, Some("alice"), Some("s3creto"))
        .unwrap()
        .expect("should find alice");
    assert_eq!(usuario.id, id);
    assert_eq!(usuario.rol, "admin");

    assert!(find_by_credentials(&conn, Some("alice"), Some("S3creto"))
        .unwrap()
        .is_none());
    assert!(find_by_credentials(&conn, Some("alicia"), Some("s3creto"))
        .unwrap()
        .is_none());
}

#[test]
fn missing_credentials_never_match() {
    let conn = test_db();
    seed_usuario(&conn);

    assert!(find_by_credentials(&conn, Some("operario"), None)
        .unwrap()
        .is_none());
    assert!(find_by_credentials(&conn, None, Some("clave"))
        .unwrap()
        .is_none());
}

#[test]
fn registration_without_password_violates_schema() {
    let conn = test_db();
    let err = register_usuario(
        &conn,
        &NewUsuario {
            nombre_usuario: Some("sin_clave"),
            password: None,
            rol: DEFAULT_ROL,
        },
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
}

#[test]
fn duplicate_user_names_are_not_rejected() {
    let conn = test_db();
    let nuevo = NewUsuario {
        nombre_usuario: Some("bob"),
        password: Some("uno"),
        rol: DEFAULT_ROL,
    };
    let first = register_usuario(&conn, &nuevo).unwrap();
    let second = register_usuario(&conn, &nuevo).unwrap();
    assert_ne!(first, second);
}

// ── formularios ──────────────────────────────────────────────────────

#[test]
fn get_formulario_decodes_document() {
    let conn = test_db();
    let empresa = seed_empresa(&conn, "Constructora Sur");
    let usuario = seed_usuario(&conn);
    let id = save(&conn, empresa, usuario, "2024-05-02");

    let formulario = get_formulario(&conn, id).unwrap().expect("should exist");
    assert_eq!(formulario.empresa_id, empresa);
    assert_eq!(formulario.usuario_id, usuario);
    assert_eq!(formulario.fecha_completado.as_deref(), Some("2024-05-02 10:00:00"));
    assert_eq!(formulario.datos_formulario.encabezado.fecha, "2024-05-02");

    let obligatorio: i64 = conn
        .query_row(
            "SELECT es_obligatorio FROM formularios_completados WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(obligatorio, 1);
}

#[test]
fn get_formulario_missing_is_none() {
    let conn = test_db();
    assert!(get_formulario(&conn, 42).unwrap().is_none());
}

#[test]
fn insert_formulario_rejects_unknown_empresa() {
    let conn = test_db();
    let usuario = seed_usuario(&conn);

    let err = insert_formulario(
        &conn,
        &NewFormulario {
            empresa_id: 99,
            usuario_id: usuario,
            tipo_formulario_id: 1,
            fecha_completado: None,
            datos: DatosFormulario::default(),
        },
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
}

#[test]
fn list_subformularios_keys_by_type_and_last_write_wins() {
    let conn = test_db();
    let empresa = seed_empresa(&conn, "Constructora Sur");
    let usuario = seed_usuario(&conn);
    let id = save(&conn, empresa, usuario, "2024-05-02");

    insert_subformulario(&conn, id, 2, &sub_con_campo("vendas", "3")).unwrap();
    insert_subformulario(&conn, id, 3, &sub_con_campo("lesion", "no")).unwrap();
    insert_subformulario(&conn, id, 2, &sub_con_campo("vendas", "5")).unwrap();

    let subs = list_subformularios(&conn, id).unwrap();
    assert_eq!(subs.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(subs[&2].campos["vendas"], "5");
}

#[test]
fn find_filtrados_matches_company_and_header_date() {
    let conn = test_db();
    let sur = seed_empresa(&conn, "Constructora Sur");
    let norte = seed_empresa(&conn, "Áridos del Norte");
    let usuario = seed_usuario(&conn);

    let con_subs = save(&conn, sur, usuario, "2024-05-02");
    let sin_subs = save(&conn, sur, usuario, "2024-05-02");
    save(&conn, sur, usuario, "2024-05-03");
    save(&conn, norte, usuario, "2024-05-02");

    insert_subformulario(&conn, con_subs, 2, &sub_con_campo("vendas", "3")).unwrap();
    insert_subformulario(&conn, con_subs, 3, &sub_con_campo("lesion", "no")).unwrap();

    let encontrados = find_filtrados(&conn, sur, "2024-05-02").unwrap();
    assert_eq!(encontrados.len(), 2);

    let primero = &encontrados[0];
    assert_eq!(primero.formulario_principal.id, con_subs);
    assert_eq!(
        primero.formulario_principal.nombre_empresa.as_deref(),
        Some("Constructora Sur")
    );
    assert_eq!(primero.subformularios.len(), 2);

    let segundo = &encontrados[1];
    assert_eq!(segundo.formulario_principal.id, sin_subs);
    assert!(segundo.subformularios.is_empty());
}

#[test]
fn find_filtrados_without_matches_is_empty() {
    let conn = test_db();
    let sur = seed_empresa(&conn, "Constructora Sur");
    assert!(find_filtrados(&conn, sur, "2030-01-01").unwrap().is_empty());
}

#[test]
fn group_rows_skips_null_and_zero_types() {
    let row = |tipo: Option<i64>, datos: Option<&str>| JoinedRow {
        id: 7,
        empresa_id: 1,
        fecha_completado: None,
        datos_formulario: "{}".to_string(),
        tipo_formulario_id: tipo,
        datos_subformulario: datos.map(str::to_string),
        nombre_empresa: None,
    };

    let grouped = group_rows(vec![
        row(None, None),
        row(Some(0), Some("{}")),
        row(Some(3), Some(r#"{"observaciones":"ok"}"#)),
    ])
    .unwrap();

    assert_eq!(grouped.len(), 1);
    let subs = &grouped[0].subformularios;
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[&3].observaciones, "ok");
}

#[test]
fn grouped_response_serializes_type_ids_as_keys() {
    let conn = test_db();
    let empresa = seed_empresa(&conn, "Constructora Sur");
    let usuario = seed_usuario(&conn);
    let id = save(&conn, empresa, usuario, "2024-05-02");
    insert_subformulario(&conn, id, 2, &sub_con_campo("vendas", "3")).unwrap();

    let encontrados = find_filtrados(&conn, empresa, "2024-05-02").unwrap();
    let value = serde_json::to_value(&encontrados).unwrap();

    assert_eq!(value[0]["formularioPrincipal"]["id"], id);
    assert_eq!(value[0]["subformularios"]["2"]["campos"]["vendas"], "3");
}
