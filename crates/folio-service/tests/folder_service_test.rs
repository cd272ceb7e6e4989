//! Behaviour tests for the folder services over the in-memory store.

mod helpers;

use std::collections::HashSet;
use std::time::Duration;

use folio_core::ErrorKind;
use folio_core::types::{FolderId, MaterialId, PageRequest};
use folio_database::FolderStore;
use folio_entity::folder::{FolderStats, FolderVisibility, UpdateFolder};
use folio_service::CreateFolderRequest;

use helpers::TestApp;

#[tokio::test]
async fn test_create_defaults_to_public_and_derives_slug() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;

    let folder = app
        .folders
        .create(
            &owner,
            CreateFolderRequest {
                label: "Data Structures!!".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(folder.visibility, FolderVisibility::Public);
    assert_eq!(folder.creator_id, Some(owner.user_id));
    let suffix = folder.slug.strip_prefix("data_structures_").unwrap();
    assert_eq!(suffix.len(), 8);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_same_label_gets_distinct_slugs() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;

    let a = app.create_folder(&owner, "Algebra").await;
    let b = app.create_folder(&owner, "Algebra").await;
    assert_ne!(a.slug, b.slug);
}

#[tokio::test]
async fn test_blank_label_is_rejected() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;

    let err = app
        .folders
        .create(
            &owner,
            CreateFolderRequest {
                label: "   ".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_get_resolves_by_id_and_by_slug() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let folder = app.create_folder(&owner, "Data Structures").await;

    let by_id = app.folders.get(&folder.id.to_string(), None).await.unwrap();
    let by_slug = app.folders.get(&folder.slug, None).await.unwrap();
    assert_eq!(by_id.folder.id, folder.id);
    assert_eq!(by_slug.folder.id, folder.id);

    let upper = folder.id.to_string().to_uppercase();
    assert_eq!(app.folders.get(&upper, None).await.unwrap().folder.id, folder.id);
}

#[tokio::test]
async fn test_resolve_returns_bare_folder_without_a_view() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let folder = app.create_folder(&owner, "Resolved").await;

    let by_slug = app.folders.resolve(&folder.slug).await.unwrap();
    let by_id = app.folders.resolve(&folder.id.to_string()).await.unwrap();
    assert_eq!(by_slug.id, folder.id);
    assert_eq!(by_id.slug, folder.slug);

    let err = app.folders.resolve("missing_1a2b3c4d").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    assert!(app.folders.flush_view_tracking(Duration::from_secs(1)).await);
    let stored = app.store.find_by_id(folder.id).await.unwrap().unwrap();
    assert_eq!(stored.views, 0);
}

#[tokio::test]
async fn test_get_unknown_is_not_found() {
    let app = TestApp::new();

    let err = app
        .folders
        .get("123e4567-e89b-12d3-a456-426614174000", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app.folders.get("no_such_slug_1a2b3c4d", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_cycles_are_rejected() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let a = app.create_folder(&owner, "A").await;
    let b = app.create_folder(&owner, "B").await;
    let c = app.create_folder(&owner, "C").await;

    app.folders.add_nested_folder(&owner, a.id, b.id).await.unwrap();
    app.folders.add_nested_folder(&owner, b.id, c.id).await.unwrap();

    let err = app
        .folders
        .add_nested_folder(&owner, c.id, a.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = app
        .folders
        .add_nested_folder(&owner, a.id, a.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = app
        .folders
        .add_nested_folder(&owner, b.id, a.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    // A diamond is not a cycle.
    app.folders.add_nested_folder(&owner, a.id, c.id).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_opposite_nesting_admits_one() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let a = app.create_folder(&owner, "A").await;
    let b = app.create_folder(&owner, "B").await;

    let (ab, ba) = tokio::join!(
        app.folders.add_nested_folder(&owner, a.id, b.id),
        app.folders.add_nested_folder(&owner, b.id, a.id),
    );
    assert_eq!(ab.is_ok() as u8 + ba.is_ok() as u8, 1);
    assert_eq!(app.store.link_count().await, 1);
}

#[tokio::test]
async fn test_duplicate_links_conflict() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let folder = app.create_folder(&owner, "Reading").await;
    let child = app.create_folder(&owner, "Week 1").await;
    let material = app.create_material(&owner, "Notes").await;

    app.folders
        .add_material_to_folder(&owner, folder.id, material)
        .await
        .unwrap();
    let err = app
        .folders
        .add_material_to_folder(&owner, folder.id, material)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    app.folders
        .add_nested_folder(&owner, folder.id, child.id)
        .await
        .unwrap();
    let err = app
        .folders
        .add_nested_folder(&owner, folder.id, child.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_links_hold_exactly_one_item() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let folder = app.create_folder(&owner, "Mixed").await;
    let child = app.create_folder(&owner, "Child").await;
    let material = app.create_material(&owner, "Notes").await;

    let material_link = app
        .folders
        .add_material_to_folder(&owner, folder.id, material)
        .await
        .unwrap();
    let nested_link = app
        .folders
        .add_nested_folder(&owner, folder.id, child.id)
        .await
        .unwrap();

    assert_eq!(material_link.item.material_id(), Some(material));
    assert_eq!(material_link.item.folder_id(), None);
    assert_eq!(nested_link.item.folder_id(), Some(child.id));
    assert_eq!(nested_link.item.material_id(), None);
}

#[tokio::test]
async fn test_counts_match_links_in_any_order() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let first = app.create_folder(&owner, "First").await;
    let second = app.create_folder(&owner, "Second").await;
    let materials = [
        app.create_material(&owner, "m1").await,
        app.create_material(&owner, "m2").await,
        app.create_material(&owner, "m3").await,
    ];
    let nested = [
        app.create_folder(&owner, "n1").await,
        app.create_folder(&owner, "n2").await,
    ];

    for m in materials {
        app.folders
            .add_material_to_folder(&owner, first.id, m)
            .await
            .unwrap();
    }
    for n in &nested {
        app.folders
            .add_nested_folder(&owner, first.id, n.id)
            .await
            .unwrap();
    }
    for n in nested.iter().rev() {
        app.folders
            .add_nested_folder(&owner, second.id, n.id)
            .await
            .unwrap();
    }
    for m in materials.iter().rev() {
        app.folders
            .add_material_to_folder(&owner, second.id, *m)
            .await
            .unwrap();
    }

    let expected = FolderStats {
        material_count: 3,
        nested_folder_count: 2,
    };
    for id in [first.id, second.id] {
        assert_eq!(app.folders.get_folder_stats(id).await.unwrap(), expected);
        let detail = app.folders.get(&id.to_string(), None).await.unwrap();
        assert_eq!(detail.stats(), expected);
    }

    let listed = app
        .folders
        .find_by_creator(owner.user_id, PageRequest::new(1, 20))
        .await
        .unwrap();
    for row in listed.items.iter() {
        if row.folder.id == first.id || row.folder.id == second.id {
            assert_eq!(row.stats(), expected);
        }
    }

    let searched = app
        .folders
        .search_folders("first", PageRequest::new(1, 20))
        .await
        .unwrap();
    assert_eq!(searched.items.len(), 1);
    assert_eq!(searched.items[0].stats(), expected);
}

#[tokio::test]
async fn test_detail_includes_one_level_with_child_counts() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let parent = app.create_folder(&owner, "Parent").await;
    let child = app.create_folder(&owner, "Child").await;
    let grandchild = app.create_folder(&owner, "Grandchild").await;
    let material = app.create_material(&owner, "Notes").await;
    let child_material = app.create_material(&owner, "Child notes").await;

    app.folders
        .add_material_to_folder(&owner, parent.id, material)
        .await
        .unwrap();
    app.folders
        .add_nested_folder(&owner, parent.id, child.id)
        .await
        .unwrap();
    app.folders
        .add_material_to_folder(&owner, child.id, child_material)
        .await
        .unwrap();
    app.folders
        .add_nested_folder(&owner, child.id, grandchild.id)
        .await
        .unwrap();

    let detail = app.folders.get(&parent.slug, None).await.unwrap();
    assert_eq!(detail.materials.len(), 1);
    assert_eq!(detail.materials[0].material.title, "Notes");
    assert_eq!(detail.nested_folders.len(), 1);
    assert_eq!(detail.nested_folders[0].folder.id, child.id);
    assert_eq!(detail.nested_folders[0].material_count, 1);
    assert_eq!(
        detail.creator.as_ref().map(|c| c.username.as_str()),
        Some("owner")
    );
}

#[tokio::test]
async fn test_non_owner_is_denied_owner_actions() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let stranger = app.create_test_user("stranger").await;
    let material = app.create_material(&owner, "Notes").await;

    for visibility in [FolderVisibility::Public, FolderVisibility::Private] {
        let folder = app.create_folder_with(&owner, "Owned", visibility).await;
        let other = app.create_folder(&owner, "Other").await;
        app.folders
            .add_material_to_folder(&owner, folder.id, material)
            .await
            .unwrap();
        app.folders
            .add_nested_folder(&owner, folder.id, other.id)
            .await
            .unwrap();

        let patch = UpdateFolder {
            label: Some("Hijacked".to_string()),
            ..Default::default()
        };
        let own = app.create_folder(&stranger, "Mine").await;
        let results = [
            app.folders.update(&stranger, folder.id, patch).await.map(|_| ()),
            app.folders.remove(&stranger, folder.id).await,
            app.folders
                .remove_material_from_folder(&stranger, folder.id, material)
                .await
                .map(|_| ()),
            app.folders
                .add_nested_folder(&stranger, folder.id, own.id)
                .await
                .map(|_| ()),
            app.folders
                .remove_nested_folder(&stranger, folder.id, other.id)
                .await
                .map(|_| ()),
        ];
        for result in results {
            assert_eq!(result.unwrap_err().kind, ErrorKind::Authorization);
        }
    }
}

#[tokio::test]
async fn test_public_folder_accepts_but_does_not_release_contributions() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let contributor = app.create_test_user("contributor").await;
    let public = app.create_folder(&owner, "Shared").await;
    let private = app
        .create_folder_with(&owner, "Mine", FolderVisibility::Private)
        .await;
    let material = app.create_material(&contributor, "Contribution").await;

    app.folders
        .add_material_to_folder(&contributor, public.id, material)
        .await
        .unwrap();

    let err = app
        .folders
        .remove_material_from_folder(&contributor, public.id, material)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);

    let err = app
        .folders
        .add_material_to_folder(&contributor, private.id, material)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);

    app.folders
        .remove_material_from_folder(&owner, public.id, material)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_nesting_someone_elses_folder_only_needs_parent_ownership() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let other = app.create_test_user("other").await;
    let parent = app.create_folder(&owner, "Parent").await;
    let foreign = app
        .create_folder_with(&other, "Foreign", FolderVisibility::Private)
        .await;

    app.folders
        .add_nested_folder(&owner, parent.id, foreign.id)
        .await
        .unwrap();

    let err = app
        .folders
        .add_nested_folder(&owner, parent.id, FolderId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_has_more_pagination() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    for i in 0..15 {
        app.create_folder(&owner, &format!("Folder {i}")).await;
    }

    let first = app
        .folders
        .find_by_creator(owner.user_id, PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 10);
    assert!(first.has_more);

    let second = app
        .folders
        .find_by_creator(owner.user_id, PageRequest::new(2, 10))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 5);
    assert!(!second.has_more);

    let ids: HashSet<FolderId> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|r| r.folder.id)
        .collect();
    assert_eq!(ids.len(), 15);
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    app.create_folder(&owner, "Only").await;

    let page = app
        .folders
        .find_by_creator(owner.user_id, PageRequest::new(u64::MAX, 100))
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_more);

    let searched = app
        .folders
        .search_folders("only", PageRequest::new(u64::MAX, 100))
        .await
        .unwrap();
    assert!(searched.items.is_empty());

    let public = app
        .folders
        .find_all_paginated(PageRequest::new(u64::MAX, 100))
        .await
        .unwrap();
    assert!(public.items.is_empty());
}

#[tokio::test]
async fn test_find_all_paginated_lists_only_public() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    app.create_folder(&owner, "Open").await;
    app.create_folder_with(&owner, "Closed", FolderVisibility::Private)
        .await;

    let page = app
        .folders
        .find_all_paginated(PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].folder.label, "Open");
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_search_ranks_by_popularity() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let quiet = app.create_folder(&owner, "Physics basics").await;
    let liked = app.create_folder(&owner, "Physics advanced").await;
    let unrelated = app.create_folder(&owner, "Chemistry").await;
    app.store.set_likes(liked.id, 5).await.unwrap();

    let page = app
        .folders
        .search_folders("PHYSICS", PageRequest::new(1, 10))
        .await
        .unwrap();
    let ids: Vec<FolderId> = page.items.iter().map(|r| r.folder.id).collect();
    assert_eq!(ids, vec![liked.id, quiet.id]);
    assert!(!ids.contains(&unrelated.id));

    let err = app
        .folders
        .search_folders("  ", PageRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_get_with_viewer_tracks_view() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let viewer = app.create_test_user("viewer").await;
    let folder = app.create_folder(&owner, "Watched").await;

    app.folders.get(&folder.slug, None).await.unwrap();
    app.folders.get(&folder.slug, Some(&viewer)).await.unwrap();

    let seen = app.wait_for_views(folder.id, 1).await;
    assert_eq!(seen.views, 1);
    assert!(seen.last_viewed_at.is_some());
}

#[tokio::test]
async fn test_flush_waits_for_pending_view_writes() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let viewer = app.create_test_user("viewer").await;
    let folder = app.create_folder(&owner, "Flushed").await;

    app.folders.get(&folder.slug, Some(&viewer)).await.unwrap();
    app.folders.get(&folder.slug, Some(&viewer)).await.unwrap();
    assert!(app.folders.flush_view_tracking(Duration::from_secs(1)).await);

    let stored = app.store.find_by_id(folder.id).await.unwrap().unwrap();
    assert_eq!(stored.views, 2);

    // Views recorded after a flush are still tracked.
    app.folders.get(&folder.slug, Some(&viewer)).await.unwrap();
    assert!(app.folders.flush_view_tracking(Duration::from_secs(1)).await);
    let stored = app.store.find_by_id(folder.id).await.unwrap().unwrap();
    assert_eq!(stored.views, 3);
}

#[tokio::test]
async fn test_view_tracking_failure_does_not_fail_get() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let folder = app.create_folder(&owner, "Flaky").await;
    app.store.set_view_tracking_failure(true);

    let detail = app.folders.get(&folder.slug, Some(&owner)).await.unwrap();
    assert_eq!(detail.folder.id, folder.id);

    tokio::task::yield_now().await;
    let stats = app.folders.get_folder_stats(folder.id).await.unwrap();
    assert_eq!(stats, FolderStats::default());
}

#[tokio::test]
async fn test_update_keeps_slug_and_clears_description() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let folder = app
        .folders
        .create(
            &owner,
            CreateFolderRequest {
                label: "Old name".to_string(),
                description: Some("About".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let updated = app
        .folders
        .update(
            &owner,
            folder.id,
            UpdateFolder {
                label: Some("New name".to_string()),
                description: Some(String::new()),
                visibility: Some(FolderVisibility::Private),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.label, "New name");
    assert_eq!(updated.slug, folder.slug);
    assert_eq!(updated.description, None);
    assert_eq!(updated.visibility, FolderVisibility::Private);
}

#[tokio::test]
async fn test_remove_drops_links_but_keeps_children() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let grandparent = app.create_folder(&owner, "Grandparent").await;
    let parent = app.create_folder(&owner, "Parent").await;
    let child = app.create_folder(&owner, "Child").await;

    app.folders
        .add_nested_folder(&owner, grandparent.id, parent.id)
        .await
        .unwrap();
    app.folders
        .add_nested_folder(&owner, parent.id, child.id)
        .await
        .unwrap();

    app.folders.remove(&owner, parent.id).await.unwrap();

    assert!(app.folders.get(&child.slug, None).await.is_ok());
    let stats = app.folders.get_folder_stats(grandparent.id).await.unwrap();
    assert_eq!(stats.nested_folder_count, 0);
    assert_eq!(
        app.folders.get(&parent.id.to_string(), None).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_remove_missing_links_is_not_found() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let folder = app.create_folder(&owner, "Empty").await;
    let child = app.create_folder(&owner, "Loose").await;

    let err = app
        .folders
        .remove_material_from_folder(&owner, folder.id, MaterialId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .folders
        .remove_nested_folder(&owner, folder.id, child.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_material_lookups() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let other = app.create_test_user("other").await;
    let a = app.create_folder(&owner, "A").await;
    let b = app.create_folder(&owner, "B").await;
    let theirs = app.create_folder(&other, "Theirs").await;
    let shared = app.create_material(&owner, "Shared").await;
    let only_theirs = app.create_material(&other, "Only theirs").await;

    app.folders
        .add_material_to_folder(&owner, a.id, shared)
        .await
        .unwrap();
    app.folders
        .add_material_to_folder(&owner, b.id, shared)
        .await
        .unwrap();
    app.folders
        .add_material_to_folder(&other, theirs.id, only_theirs)
        .await
        .unwrap();

    let holders = app.folders.get_folders_by_material(shared).await.unwrap();
    let holder_ids: HashSet<FolderId> = holders.iter().map(|d| d.folder.id).collect();
    assert_eq!(holder_ids, HashSet::from([a.id, b.id]));

    let ids = app
        .folders
        .get_material_ids_in_user_folders(owner.user_id)
        .await
        .unwrap();
    assert_eq!(ids, vec![shared]);
}

#[tokio::test]
async fn test_tree_marks_depth_cutoff() {
    let app = TestApp::new();
    let owner = app.create_test_user("owner").await;
    let root = app.create_folder(&owner, "Root").await;
    let mid = app.create_folder(&owner, "Mid").await;
    let leaf = app.create_folder(&owner, "Leaf").await;
    let material = app.create_material(&owner, "Notes").await;

    app.folders.add_nested_folder(&owner, root.id, mid.id).await.unwrap();
    app.folders.add_nested_folder(&owner, mid.id, leaf.id).await.unwrap();
    app.folders
        .add_nested_folder(&owner, root.id, leaf.id)
        .await
        .unwrap();
    app.folders
        .add_material_to_folder(&owner, leaf.id, material)
        .await
        .unwrap();

    let tree = app.trees.get_tree(&root.slug, None).await.unwrap();
    assert_eq!(tree.total_folders, 3);
    assert_eq!(tree.root.nested_folder_count, 2);

    let shallow = app.trees.get_tree(&root.id.to_string(), Some(1)).await.unwrap();
    let mid_node = shallow
        .root
        .children
        .iter()
        .find(|n| n.id == mid.id)
        .unwrap();
    assert!(mid_node.truncated);
    assert!(mid_node.children.is_empty());
}
