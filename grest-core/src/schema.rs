//! # Schema Loader
//!
//! This module turns Protobuf schema definitions into a navigable `prost_reflect::DescriptorPool`.
//!
//! The main entry point, [`Schema::from_source`], compiles a single in-memory `.proto` unit.
//! Imports it declares are resolved in this order:
//!
//! 1. The in-memory unit itself (named [`INLINE_FILE_NAME`]).
//! 2. The well-known types bundled with the compiler (`google/protobuf/*.proto`).
//! 3. The filesystem, relative to the root of [`ImportPolicy::Filesystem`], if the policy allows it.
//!
//! Reading imports from disk means that compiling untrusted schema text can disclose any
//! `.proto`-parseable file readable by the process. Use [`ImportPolicy::Sandboxed`] for such input.
use prost_reflect::{DescriptorPool, MessageDescriptor, MethodDescriptor};
use protox::{
    Compiler,
    file::{File, FileResolver, GoogleFileResolver},
};
use std::path::{Path, PathBuf};

/// Name given to the in-memory unit when compiling from source text.
pub const INLINE_FILE_NAME: &str = "__inline.proto";

#[derive(Debug, thiserror::Error)]
pub enum SchemaParseError {
    #[error("Failed to compile schema: '{0}'")]
    Compile(#[from] protox::Error),
    #[error("Expected a single top-level schema unit, got {0}")]
    UnitCount(usize),
    #[error("Failed to read schema file '{path}': '{source}'")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to decode descriptor set: '{0}'")]
    DescriptorSet(#[from] prost_reflect::DescriptorError),
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),
    #[error("Method '{method}' not found in service '{service}'")]
    MethodNotFound { service: String, method: String },
    #[error("Message '{0}' not found")]
    MessageNotFound(String),
}

/// How imports that are not supplied in memory get resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Only the in-memory unit and the bundled well-known types are visible.
    Sandboxed,
    /// Imports are read from disk, relative to `root`.
    Filesystem { root: PathBuf },
}

impl Default for ImportPolicy {
    fn default() -> Self {
        ImportPolicy::Filesystem {
            root: PathBuf::from("."),
        }
    }
}

/// A compiled schema: every descriptor reachable from the loaded unit(s).
///
/// Cloning is cheap, the underlying pool is reference counted and immutable.
#[derive(Debug, Clone)]
pub struct Schema {
    pool: DescriptorPool,
}

impl Schema {
    /// Compiles a single `.proto` unit held in memory.
    ///
    /// # Returns
    ///
    /// * `Ok(Schema)` - The compiled schema, imports included.
    /// * `Err(SchemaParseError)` - If the source (or one of its imports) is malformed, or if
    ///   compilation did not yield exactly one top-level unit.
    pub fn from_source(source: &str, policy: ImportPolicy) -> Result<Self, SchemaParseError> {
        let resolver = InlineResolver {
            source: source.to_string(),
            policy,
            google: GoogleFileResolver::new(),
        };

        let mut compiler = Compiler::with_file_resolver(resolver);
        compiler.open_file(INLINE_FILE_NAME)?;

        let units = compiler.file_descriptor_set().file.len();
        if units != 1 {
            return Err(SchemaParseError::UnitCount(units));
        }

        Ok(Self {
            pool: compiler.descriptor_pool(),
        })
    }

    /// Reads a `.proto` file from disk and compiles it as the in-memory unit.
    pub fn from_file(path: impl AsRef<Path>, policy: ImportPolicy) -> Result<Self, SchemaParseError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SchemaParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(&source, policy)
    }

    /// Decodes an already compiled, binary encoded `FileDescriptorSet`.
    pub fn from_descriptor_set(bytes: &[u8]) -> Result<Self, SchemaParseError> {
        let pool = DescriptorPool::decode(bytes)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Resolves a method from its fully qualified service name and its method name.
    pub fn method(&self, service: &str, method: &str) -> Result<MethodDescriptor, LookupError> {
        self.pool
            .get_service_by_name(service)
            .ok_or_else(|| LookupError::ServiceNotFound(service.to_string()))?
            .methods()
            .find(|m| m.name() == method)
            .ok_or_else(|| LookupError::MethodNotFound {
                service: service.to_string(),
                method: method.to_string(),
            })
    }

    /// Resolves a message from its fully qualified name.
    pub fn message(&self, name: &str) -> Result<MessageDescriptor, LookupError> {
        self.pool
            .get_message_by_name(name)
            .ok_or_else(|| LookupError::MessageNotFound(name.to_string()))
    }
}

struct InlineResolver {
    source: String,
    policy: ImportPolicy,
    google: GoogleFileResolver,
}

impl FileResolver for InlineResolver {
    fn open_file(&self, name: &str) -> Result<File, protox::Error> {
        if name == INLINE_FILE_NAME {
            return File::from_source(name, &self.source);
        }

        if let Ok(file) = self.google.open_file(name) {
            return Ok(file);
        }

        match &self.policy {
            ImportPolicy::Filesystem { root } => File::open(name, &root.join(name)),
            ImportPolicy::Sandboxed => Err(protox::Error::file_not_found(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PET_PROTO: &str = r#"
        syntax = "proto3";
        package petstore;

        import "google/protobuf/empty.proto";

        message Pet {
            int64 id = 1;
            string name = 2;
        }

        message GetPetRequest {
            int64 petId = 1;
        }

        service PetService {
            rpc GetPet(GetPetRequest) returns (Pet);
            rpc Ping(google.protobuf.Empty) returns (google.protobuf.Empty);
        }
    "#;

    #[test]
    fn test_from_source_resolves_descriptors() {
        let schema = Schema::from_source(PET_PROTO, ImportPolicy::Sandboxed).unwrap();

        let method = schema.method("petstore.PetService", "GetPet").unwrap();
        assert_eq!(method.input().full_name(), "petstore.GetPetRequest");
        assert_eq!(method.output().full_name(), "petstore.Pet");

        let pet = schema.message("petstore.Pet").unwrap();
        assert!(pet.get_field_by_name("name").is_some());

        // Well-known types are available even when sandboxed
        assert!(schema.message("google.protobuf.Empty").is_ok());
    }

    #[test]
    fn test_lookup_errors() {
        let schema = Schema::from_source(PET_PROTO, ImportPolicy::Sandboxed).unwrap();

        assert!(matches!(
            schema.method("petstore.Ghost", "GetPet"),
            Err(LookupError::ServiceNotFound(_))
        ));
        assert!(matches!(
            schema.method("petstore.PetService", "Ghost"),
            Err(LookupError::MethodNotFound { .. })
        ));
        assert!(matches!(
            schema.message("petstore.Ghost"),
            Err(LookupError::MessageNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_source_fails() {
        let result = Schema::from_source("message Broken {", ImportPolicy::Sandboxed);
        assert!(matches!(result, Err(SchemaParseError::Compile(_))));
    }

    #[test]
    fn test_sandboxed_policy_refuses_filesystem_imports() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(
            temp_dir.path().join("common.proto"),
            r#"syntax = "proto3"; package common; message Shared { string id = 1; }"#,
        )
        .expect("Failed to write proto file");

        let source = r#"
            syntax = "proto3";
            package app;
            import "common.proto";
            message Wrapper { common.Shared shared = 1; }
        "#;

        let sandboxed = Schema::from_source(source, ImportPolicy::Sandboxed);
        assert!(matches!(sandboxed, Err(SchemaParseError::Compile(_))));

        let schema = Schema::from_source(
            source,
            ImportPolicy::Filesystem {
                root: temp_dir.path().to_path_buf(),
            },
        )
        .unwrap();
        assert!(schema.message("common.Shared").is_ok());
        assert!(schema.message("app.Wrapper").is_ok());
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let result = Schema::from_file("/definitely/not/here.proto", ImportPolicy::Sandboxed);
        assert!(matches!(result, Err(SchemaParseError::Io { .. })));
    }
}
