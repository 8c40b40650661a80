//! Owner references between a game and its dependent resources.
//!
//! Deletion of an owner cascades to everything carrying its controller reference.
//! The cascade itself is done by the API server garbage collector.

use crate::error::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

/// Make `owner` the controller of the object described by `meta`
pub fn bind<O>(owner: &O, meta: &mut ObjectMeta) -> Result<()>
where
    O: Resource<DynamicType = ()>,
{
    let oref = owner.controller_owner_ref(&()).ok_or_else(|| {
        Error::OwnerReference(format!("{} has no name or uid yet", owner.name_any()))
    })?;

    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    if refs.iter().any(|r| r.uid == oref.uid) {
        return Ok(());
    }
    if let Some(other) = refs.iter().find(|r| r.controller == Some(true)) {
        return Err(Error::OwnerReference(format!(
            "already controlled by {} {}",
            other.kind, other.name
        )));
    }
    refs.push(oref);
    Ok(())
}

#[cfg(test)]
pub fn is_controlled_by<O>(meta: &ObjectMeta, owner: &O) -> bool
where
    O: Resource,
{
    let uid = owner.meta().uid.as_deref();
    uid.is_some()
        && meta
            .owner_references
            .as_ref()
            .map(|refs| {
                refs.iter()
                    .any(|r| r.controller == Some(true) && Some(r.uid.as_str()) == uid)
            })
            .unwrap_or(false)
}
