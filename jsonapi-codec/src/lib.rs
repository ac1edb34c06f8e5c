//! JSON:API document codec
//!
//!     This crate converts between JSON:API 1.1 documents and an in-memory resource graph,
//!     in both directions, and implements the Atomic Operations extension on top of that.
//!
//!     TLDR:
//!         - Wire shapes live in ./document and know nothing about resource types.
//!         - Resource types are described by a ResourceDirectory (./resources/directory.rs).
//!         - Responses go through ResponseAdapter (./response), requests through
//!           DocumentReader (./reader) or OperationsReader (./atomic).
//!         - Everything that can go wrong is a CodecError with a pointer into the body.
//!
//!     This is a pure lib: no I/O, no transport, no persistence. It powers jsonapi-cli but
//!     supposes nothing about the environment it runs in.
//!
//! Architecture
//!
//!     .
//!     ├── error.rs                # CodecError, ErrorKind, SourcePointer
//!     ├── document                # Wire model
//!     │   ├── data.rs             # Tri-state `data` member
//!     │   ├── nodes.rs            # Document, ResourceObject, RelationshipObject, ...
//!     │   └── atomic.rs           # atomic:operations / atomic:results shapes
//!     ├── resources               # Resource types and instances
//!     │   ├── shape.rs            # ResourceShape, AttrDef, RelationshipDef
//!     │   ├── directory.rs        # ResourceDirectory trait, ResourceGraph registry
//!     │   └── resource.rs         # Resource, RelationshipValue, ResourceKey
//!     ├── query                   # Include expressions, sparse fieldsets, FieldSelector
//!     ├── links.rs                # LinkBuilder
//!     ├── request.rs              # RequestScope
//!     ├── options.rs              # CodecOptions
//!     ├── response                # Outbound conversion, included set
//!     ├── reader                  # Inbound conversion, field hooks, identity rules
//!     └── atomic                  # Batch reader, local IDs, processor
//!
//!     Data flows like this:
//!
//!         body ─► reader / atomic ─► Resource ─► host ─► ResponseAdapter ─► Document ─► JSON
//!                        │                                     │
//!                  LocalIdTracker                   FieldSelector, LinkBuilder
//!
//! Core Algorithms
//!
//!     Outbound, the adapter walks the include expression alongside the relationship values.
//!     Every resource object is stored once in an included set keyed by (type, id) or
//!     (type, lid); a resource reached again only fills relationships that are still
//!     missing linkage. Primary data is converted first so that it is never overwritten by
//!     a copy reached through an include path.
//!
//!     Inbound, server and client share one pipeline (./reader/resource.rs). The only
//!     difference is the FieldHook: servers record which fields a request assigned,
//!     clients record nothing.
//!
//!     Atomic batches are checked structurally as a whole, then replayed against a
//!     local-ID tracker with placeholder identities, and only then executed.
//!
//! Testing
//!
//!     Unit tests live next to the code. Integration tests live in tests/, grouped by area
//!     (response, reader, atomic) and included from tests/lib.rs, sharing the fixture
//!     graph in tests/common.

pub mod atomic;
pub mod document;
pub mod error;
pub mod links;
pub mod options;
pub mod query;
pub mod reader;
pub mod request;
pub mod resources;
pub mod response;

pub use atomic::{
    LocalIdTracker, LocalIdValidator, Operation, OperationHandler, OperationsProcessor,
    OperationsReader, ProcessError,
};
pub use document::{encode, encode_pretty, parse_document, Data, Document};
pub use error::{CodecError, ErrorKind, SourcePointer};
pub use links::{LinkBuilder, NoLinks, PathLinkBuilder};
pub use options::{CodecOptions, ValueHandling};
pub use query::{FieldSelector, FieldSet, IncludeExpression, SparseFieldSetCache, SparseFieldSets};
pub use reader::{
    ClientReader, DocumentReader, FieldHook, NoTracking, RequestBody, ResponseBody, ServerReader,
    TargetedFields,
};
pub use request::{EndpointKind, OperationDescriptor, RequestScope, WriteOperationKind};
pub use resources::{
    AttrDef, AttrType, Cardinality, IdentityKind, RelationshipDef, RelationshipValue, Resource,
    ResourceDirectory, ResourceGraph, ResourceKey, ResourceShape,
};
pub use response::{OperationContainer, ResponseAdapter, ResponsePayload};
