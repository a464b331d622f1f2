//! Typed ARM resource identifiers
//!
//! Every Virtual Desktop resource lives at
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.DesktopVirtualization/{kind}/{name}`.
//! Parsing accepts any casing for the fixed keys and the namespace;
//! formatting always produces the canonical form, so `parse(format(x)) == x`.

use deskflow_cloud::{CloudError, Result};
use std::fmt;

pub const NAMESPACE: &str = "Microsoft.DesktopVirtualization";

/// Common accessors of the typed identifiers
pub trait ArmId: fmt::Display + fmt::Debug + Clone + Send + Sync + 'static {
    /// Human readable kind (e.g., "Virtual Desktop Workspace")
    const KIND: &'static str;

    fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self;

    fn parse(id: &str) -> Result<Self>;

    fn subscription_id(&self) -> &str;

    fn resource_group(&self) -> &str;

    fn name(&self) -> &str;
}

fn malformed(kind: &str, id: &str, reason: impl fmt::Display) -> CloudError {
    CloudError::MalformedId(format!("parsing {} ID {:?}: {}", kind, id, reason))
}

/// Split `id` into `(subscription, resource group, name)`, checking every fixed segment
fn parse_scoped<'a>(id: &'a str, segment: &str, kind: &str) -> Result<(&'a str, &'a str, &'a str)> {
    let path = id
        .strip_prefix('/')
        .ok_or_else(|| malformed(kind, id, "must start with `/`"))?;

    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(malformed(kind, id, "contains an empty segment"));
    }
    if parts.len() % 2 != 0 {
        return Err(malformed(kind, id, "expected key/value pairs"));
    }

    match parts.as_slice() {
        [sub_key, sub, rg_key, rg, prov_key, namespace, kind_key, name] => {
            if *sub_key != "subscriptions" {
                return Err(malformed(kind, id, "expected `subscriptions` as the first segment"));
            }
            if !rg_key.eq_ignore_ascii_case("resourceGroups") {
                return Err(malformed(kind, id, "missing `resourceGroups` segment"));
            }
            if *prov_key != "providers" {
                return Err(malformed(kind, id, "missing `providers` segment"));
            }
            if !namespace.eq_ignore_ascii_case(NAMESPACE) {
                return Err(malformed(
                    kind,
                    id,
                    format!("expected provider {} but got {}", NAMESPACE, namespace),
                ));
            }
            if !kind_key.eq_ignore_ascii_case(segment) {
                return Err(malformed(
                    kind,
                    id,
                    format!("expected `{}` but got `{}`", segment, kind_key),
                ));
            }
            Ok((*sub, *rg, *name))
        }
        _ if parts.len() > 8 => Err(malformed(kind, id, "unexpected trailing segments")),
        _ => Err(malformed(kind, id, "too few segments")),
    }
}

macro_rules! arm_id {
    ($(#[$meta:meta])* $ty:ident, $segment:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $ty {
            pub subscription_id: String,
            pub resource_group: String,
            pub name: String,
        }

        impl ArmId for $ty {
            const KIND: &'static str = $kind;

            fn new(
                subscription_id: impl Into<String>,
                resource_group: impl Into<String>,
                name: impl Into<String>,
            ) -> Self {
                Self {
                    subscription_id: subscription_id.into(),
                    resource_group: resource_group.into(),
                    name: name.into(),
                }
            }

            fn parse(id: &str) -> Result<Self> {
                let (sub, rg, name) = parse_scoped(id, $segment, $kind)?;
                Ok(<Self as ArmId>::new(sub, rg, name))
            }

            fn subscription_id(&self) -> &str {
                &self.subscription_id
            }

            fn resource_group(&self) -> &str {
                &self.resource_group
            }

            fn name(&self) -> &str {
                &self.name
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
                    self.subscription_id, self.resource_group, NAMESPACE, $segment, self.name
                )
            }
        }

        impl std::str::FromStr for $ty {
            type Err = CloudError;

            fn from_str(s: &str) -> Result<Self> {
                <Self as ArmId>::parse(s)
            }
        }
    };
}

arm_id!(
    /// ID of a Virtual Desktop workspace
    WorkspaceId,
    "workspaces",
    "Virtual Desktop Workspace"
);

arm_id!(
    /// ID of a Virtual Desktop application group
    ApplicationGroupId,
    "applicationGroups",
    "Virtual Desktop Application Group"
);

arm_id!(
    /// ID of a Virtual Desktop host pool, only referenced by application groups
    HostPoolId,
    "hostPools",
    "Virtual Desktop Host Pool"
);
