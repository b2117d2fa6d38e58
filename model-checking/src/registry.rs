use islet_rmmd::config::MAX_REALM_NUMS;
use islet_rmmd::error::Error;
use islet_rmmd::registry::RealmRegistry;

#[kani::proof]
#[kani::unwind(13)]
fn verify_registry_capacity() {
    let mut registry = RealmRegistry::new();
    let rds: [u64; MAX_REALM_NUMS + 1] = kani::any();

    for rd in rds {
        if rd == 0 {
            assert!(registry.register(rd) == Err(Error::NullDescriptor));
            continue;
        }

        // Pre-conditions
        let known_pre = registry.lookup(rd).is_some();
        let full_pre = registry.is_full();
        let len_pre = registry.len();

        let result = registry.register(rd);

        // Failure condition assertions
        kani::cover!();
        if full_pre && !known_pre {
            assert!(result == Err(Error::CapacityExceeded));
            assert!(registry.len() == len_pre);
            assert!(registry.lookup(rd).is_none());
        }

        // Success condition assertions
        kani::cover!();
        if !full_pre || known_pre {
            let handle = result.unwrap();
            assert!(registry.get(handle).map(|r| r.rd) == Some(rd));
        }

        assert!(registry.len() <= MAX_REALM_NUMS);
    }
}
