use minitar::codec::{buffer, stream};
use minitar::{Entry, MinitarError, Permissions, Tree};
use proptest::collection::vec;
use proptest::prelude::*;

fn name() -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), 1..12)
}

fn permissions() -> impl Strategy<Value = Permissions> {
    (0u16..=0o7777).prop_map(Permissions::from_wire)
}

fn entry() -> impl Strategy<Value = Entry> {
    let leaf = prop_oneof![
        (name(), permissions(), vec(any::<u8>(), 0..64)).prop_map(|(n, p, c)| Entry::file(n, p, c)),
        (name(), permissions(), vec(any::<u8>(), 0..16)).prop_map(|(n, p, t)| Entry::symlink(n, p, t)),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        (name(), permissions(), vec(inner, 0..6)).prop_map(|(n, p, children)| Entry::directory(n, p, children))
    })
}

fn tree() -> impl Strategy<Value = Tree> {
    vec(entry(), 0..6).prop_map(Tree::from)
}

proptest! {
    #[test]
    fn buffer_round_trip(tree in tree()) {
        let bytes = buffer::encode_to_vec(&tree).unwrap();
        prop_assert_eq!(bytes.len() as u64, buffer::size_of(&tree).unwrap());
        let (decoded, used) = buffer::decode(&bytes).unwrap();
        prop_assert_eq!(used, bytes.len());
        prop_assert_eq!(decoded, tree);
    }

    #[test]
    fn stream_matches_buffer(tree in tree()) {
        let mut streamed = Vec::new();
        stream::write_archive(&tree, &mut streamed).unwrap();
        prop_assert_eq!(&streamed, &buffer::encode_to_vec(&tree).unwrap());
        prop_assert_eq!(stream::read_archive(&streamed[..]).unwrap(), tree);
    }

    #[test]
    fn every_prefix_is_truncated(tree in tree()) {
        let bytes = buffer::encode_to_vec(&tree).unwrap();
        for cut in 0..bytes.len() {
            let prefix = &bytes[..cut];
            prop_assert!(
                matches!(buffer::decode(prefix), Err(MinitarError::TruncatedInput { .. })),
                "buffer prefix {} of {}", cut, bytes.len()
            );
            prop_assert!(
                matches!(stream::read_archive(prefix), Err(MinitarError::TruncatedInput { .. })),
                "stream prefix {} of {}", cut, bytes.len()
            );
        }
    }

    #[test]
    fn permission_wire_value_is_stable(bits in 0u16..=0o7777) {
        let perms = Permissions::from_wire(bits);
        prop_assert_eq!(perms.to_wire(), bits);
        prop_assert_eq!(Permissions::from_wire(perms.to_wire()), perms);
    }

    #[test]
    fn unknown_permission_bits_are_dropped(bits in any::<u16>()) {
        prop_assert_eq!(Permissions::from_wire(bits).to_wire(), bits & 0o7777);
    }

    #[test]
    fn garbage_never_panics(data in vec(any::<u8>(), 0..256)) {
        let _ = buffer::decode(&data);
        let _ = stream::read_archive(&data[..]);
    }
}
