// End-to-end tests of the aggregator over in-memory collaborators.
#![allow(clippy::unwrap_used, reason = "Unwrap is not an issue in tests")]

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use win_effective_rights::{
    AccountName, Context, DirectoryService, IdentityLookup, LocalGroup, PolicyHandle, PolicyStore,
    Principal, PrincipalKind, Resolution, Right, RightsError, RightsResolver, SecurityId,
};

const MACHINE: &str = "HOST";

fn sid_of(account: &AccountName) -> SecurityId {
    SecurityId::from_bytes(account.index_key().into_bytes())
}

fn principal(scope: &str, name: &str, kind: PrincipalKind) -> Principal {
    let account = AccountName::new(scope, name);
    let sid = sid_of(&account);
    Principal::new(account, sid, kind)
}

fn user(name: &str) -> Principal {
    principal(MACHINE, name, PrincipalKind::User)
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeIdentity {
    known: HashMap<String, Principal>,
}

impl FakeIdentity {
    fn with(principals: &[Principal]) -> Self {
        Self {
            known: principals
                .iter()
                .map(|p| (p.account.index_key(), p.clone()))
                .collect(),
        }
    }
}

impl IdentityLookup for FakeIdentity {
    fn machine_name(&self) -> &str {
        MACHINE
    }

    fn resolve(&self, account: &AccountName) -> Resolution {
        self.known
            .get(&account.index_key())
            .cloned()
            .map_or(Resolution::NotFound, Resolution::Resolved)
    }
}

#[derive(Default)]
struct PolicyData {
    rights: HashMap<Vec<u8>, Vec<Right>>,
    failing: HashSet<Vec<u8>>,
}

#[derive(Default)]
struct FakePolicyStore {
    data: Rc<PolicyData>,
    deny_open: bool,
}

impl FakePolicyStore {
    fn granting(grants: &[(&Principal, &[&str])]) -> Self {
        let mut rights = HashMap::new();
        for (principal, names) in grants {
            rights.insert(
                principal.sid.as_bytes().to_vec(),
                names.iter().map(ToString::to_string).collect(),
            );
        }
        Self {
            data: Rc::new(PolicyData {
                rights,
                failing: HashSet::new(),
            }),
            deny_open: false,
        }
    }

    fn failing_for(mut self, principal: &Principal) -> Self {
        let data = Rc::get_mut(&mut self.data).unwrap();
        data.failing.insert(principal.sid.as_bytes().to_vec());
        self
    }
}

struct FakeHandle {
    data: Rc<PolicyData>,
}

impl PolicyStore for FakePolicyStore {
    type Handle = FakeHandle;

    fn open(&self) -> Result<FakeHandle, RightsError> {
        if self.deny_open {
            return Err(RightsError::AccessDenied);
        }
        Ok(FakeHandle {
            data: Rc::clone(&self.data),
        })
    }
}

impl PolicyHandle for FakeHandle {
    fn rights_of(&self, sid: &SecurityId) -> Result<Vec<Right>, RightsError> {
        if self.data.failing.contains(sid.as_bytes()) {
            return Err(RightsError::PolicyQueryFailed(31));
        }
        Ok(self
            .data
            .rights
            .get(sid.as_bytes())
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeDirectory {
    closures: HashMap<String, Vec<Principal>>,
    unreachable: bool,
    local: Vec<LocalGroup>,
    local_walks: Rc<Cell<usize>>,
}

impl FakeDirectory {
    fn closure_of(mut self, member: &Principal, groups: &[Principal]) -> Self {
        self.closures
            .insert(member.account.index_key(), groups.to_vec());
        self
    }

    fn local_group(mut self, name: &str, members: &[&Principal]) -> Self {
        self.local.push(LocalGroup {
            name: name.to_owned(),
            members: members.iter().map(|p| p.account.clone()).collect(),
        });
        self
    }
}

impl DirectoryService for FakeDirectory {
    fn authorization_groups(
        &self,
        principal: &Principal,
        _context: Context,
    ) -> Result<Vec<Principal>, RightsError> {
        if self.unreachable {
            return Err(RightsError::DomainUnreachable(
                principal.account.scope().to_owned(),
            ));
        }
        Ok(self
            .closures
            .get(&principal.account.index_key())
            .cloned()
            .unwrap_or_default())
    }

    fn local_groups(&self) -> Vec<LocalGroup> {
        self.local_walks.set(self.local_walks.get() + 1);
        self.local.clone()
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn directly_assigned_rights_are_included() {
    let alice = user("alice");
    let resolver = RightsResolver::new(
        FakeIdentity::with(std::slice::from_ref(&alice)),
        FakePolicyStore::granting(&[(&alice, &["SeInteractiveLogonRight", "SeShutdownPrivilege"])]),
        FakeDirectory::default(),
    );

    let resolved = resolver.all_rights("alice").unwrap();
    assert_eq!(resolved.account, AccountName::new(MACHINE, "alice"));
    assert_eq!(
        resolved.rights,
        ["SeInteractiveLogonRight", "SeShutdownPrivilege"]
    );
}

#[test]
fn rights_of_nested_domain_groups_flow_through_the_closure() {
    let bob = principal("CORP", "bob", PrincipalKind::User);
    let staff = principal("CORP", "Staff", PrincipalKind::Group);
    // Nested group: bob is in Staff, Staff is in Admins. The directory
    // reports the flattened closure, as the real service does.
    let admins = principal("CORP", "Admins", PrincipalKind::Group);

    let resolver = RightsResolver::new(
        FakeIdentity::with(&[bob.clone(), staff.clone(), admins.clone()]),
        FakePolicyStore::granting(&[(&admins, &["SeRemoteShutdownPrivilege"])]),
        FakeDirectory::default().closure_of(&bob, &[staff, admins.clone()]),
    );

    let resolved = resolver.all_rights("CORP\\bob").unwrap();
    assert_eq!(resolved.rights, ["SeRemoteShutdownPrivilege"]);
}

#[test]
fn output_contains_no_duplicates_and_is_sorted() {
    let alice = user("alice");
    let operators = principal(MACHINE, "Operators", PrincipalKind::Alias);

    // The same right granted directly and through a group must appear once.
    let resolver = RightsResolver::new(
        FakeIdentity::with(&[alice.clone(), operators.clone()]),
        FakePolicyStore::granting(&[
            (&alice, &["SeBackupPrivilege", "SeAuditPrivilege"]),
            (&operators, &["SeBackupPrivilege", "SeRestorePrivilege"]),
        ]),
        FakeDirectory::default().local_group("Operators", &[&alice]),
    );

    let resolved = resolver.all_rights("alice").unwrap();
    assert_eq!(
        resolved.rights,
        ["SeAuditPrivilege", "SeBackupPrivilege", "SeRestorePrivilege"]
    );
}

#[test]
fn resolving_twice_yields_the_same_set_and_builds_the_index_once() {
    let alice = user("alice");
    let operators = principal(MACHINE, "Operators", PrincipalKind::Alias);
    let directory = FakeDirectory::default().local_group("Operators", &[&alice]);
    let walks = Rc::clone(&directory.local_walks);

    let resolver = RightsResolver::new(
        FakeIdentity::with(&[alice.clone(), operators.clone()]),
        FakePolicyStore::granting(&[(&operators, &["SeBackupPrivilege"])]),
        directory,
    );

    let first = resolver.all_rights("alice").unwrap();
    let second = resolver.all_rights("alice").unwrap();
    assert_eq!(first, second);
    assert_eq!(walks.get(), 1, "the local-group index is built exactly once");
}

#[test]
fn unqualified_input_resolves_against_the_machine() {
    let alice = user("alice");
    let resolver = RightsResolver::new(
        FakeIdentity::with(std::slice::from_ref(&alice)),
        FakePolicyStore::granting(&[]),
        FakeDirectory::default(),
    );

    assert_eq!(
        resolver.all_rights(".\\alice").unwrap().account,
        AccountName::new(MACHINE, "alice")
    );
    assert_eq!(
        resolver.all_rights("alice").unwrap().account,
        AccountName::new(MACHINE, "alice")
    );
}

#[test]
fn access_denied_fails_fast_with_nothing_partial() {
    let alice = user("alice");
    let resolver = RightsResolver::new(
        FakeIdentity::with(std::slice::from_ref(&alice)),
        FakePolicyStore {
            deny_open: true,
            ..FakePolicyStore::default()
        },
        FakeDirectory::default(),
    );

    assert_eq!(
        resolver.all_rights("alice"),
        Err(RightsError::AccessDenied)
    );
}

#[test]
fn unreachable_domain_drops_only_the_domain_derived_subset() {
    let bob = principal("CORP", "bob", PrincipalKind::User);
    let operators = principal(MACHINE, "Operators", PrincipalKind::Alias);

    let directory = FakeDirectory {
        unreachable: true,
        ..FakeDirectory::default()
    }
    .local_group("Operators", &[&bob]);

    let resolver = RightsResolver::new(
        FakeIdentity::with(&[bob.clone(), operators.clone()]),
        FakePolicyStore::granting(&[
            (&bob, &["SeInteractiveLogonRight"]),
            (&operators, &["SeBackupPrivilege"]),
        ]),
        directory,
    );

    // Direct and local-group rights survive; only domain groups are lost.
    let resolved = resolver.all_rights("CORP\\bob").unwrap();
    assert_eq!(
        resolved.rights,
        ["SeBackupPrivilege", "SeInteractiveLogonRight"]
    );
}

#[test]
fn a_failing_group_query_does_not_blank_out_other_rights() {
    let bob = principal("CORP", "bob", PrincipalKind::User);
    let healthy = principal("CORP", "Healthy", PrincipalKind::Group);
    let broken = principal("CORP", "Broken", PrincipalKind::Group);

    let resolver = RightsResolver::new(
        FakeIdentity::with(&[bob.clone(), healthy.clone(), broken.clone()]),
        FakePolicyStore::granting(&[
            (&bob, &["SeInteractiveLogonRight"]),
            (&healthy, &["SeServiceLogonRight"]),
        ])
        .failing_for(&broken),
        FakeDirectory::default().closure_of(&bob, &[broken, healthy]),
    );

    let resolved = resolver.all_rights("CORP\\bob").unwrap();
    assert_eq!(
        resolved.rights,
        ["SeInteractiveLogonRight", "SeServiceLogonRight"]
    );
}

#[test]
fn unknown_account_is_lenient_by_default_and_strict_on_request() {
    let lenient = RightsResolver::new(
        FakeIdentity::with(&[]),
        FakePolicyStore::granting(&[]),
        FakeDirectory::default(),
    );
    let resolved = lenient.all_rights("ghost").unwrap();
    assert_eq!(resolved.account, AccountName::new(MACHINE, "ghost"));
    assert!(resolved.rights.is_empty(), "lenient mode reports no rights");

    let strict = RightsResolver::new(
        FakeIdentity::with(&[]),
        FakePolicyStore::granting(&[]),
        FakeDirectory::default(),
    )
    .strict(true);
    assert_eq!(
        strict.all_rights("ghost"),
        Err(RightsError::AccountNotFound(AccountName::new(
            MACHINE, "ghost"
        )))
    );
}

#[test]
fn local_groups_of_domain_groups_contribute_their_rights() {
    let bob = principal("CORP", "bob", PrincipalKind::User);
    let ops = principal("CORP", "Ops Team", PrincipalKind::Group);
    let power = principal(MACHINE, "Power Users", PrincipalKind::Alias);

    // bob -> domain group Ops Team -> local group Power Users.
    let resolver = RightsResolver::new(
        FakeIdentity::with(&[bob.clone(), ops.clone(), power.clone()]),
        FakePolicyStore::granting(&[(&power, &["SeNetworkLogonRight"])]),
        FakeDirectory::default()
            .closure_of(&bob, std::slice::from_ref(&ops))
            .local_group("Power Users", &[&ops]),
    );

    let resolved = resolver.all_rights("CORP\\bob").unwrap();
    assert_eq!(resolved.rights, ["SeNetworkLogonRight"]);
}

#[test]
fn backup_operators_end_to_end() {
    // HOST\alice is a member of local group Backup Operators, which holds
    // SeBackupPrivilege; no direct rights, no domain groups.
    let alice = user("alice");
    let backup_operators = principal(MACHINE, "Backup Operators", PrincipalKind::Alias);

    let resolver = RightsResolver::new(
        FakeIdentity::with(&[alice.clone(), backup_operators.clone()]),
        FakePolicyStore::granting(&[(&backup_operators, &["SeBackupPrivilege"])]),
        FakeDirectory::default().local_group("Backup Operators", &[&alice]),
    );

    let resolved = resolver.all_rights("alice").unwrap();
    assert_eq!(resolved.account.to_string(), "HOST\\alice");
    assert_eq!(resolved.rights, ["SeBackupPrivilege"]);
}
