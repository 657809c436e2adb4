//! Registry trait for configurable implementations.
//!
//! Signature verifiers and token ledgers are selected by name from the
//! configuration. Each implementation module exposes a `Registry` that names
//! itself and hands out its factory.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "ecdsa" for `signature.implementations.ecdsa`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory that builds this implementation from its TOML table.
	fn factory() -> Self::Factory;
}
