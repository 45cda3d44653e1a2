//! Predicate sets: the boolean clauses behind WHERE, ON and HAVING.
//!
//! A [`PredicateSet`] is an ordered list of fragments, each tagged with a
//! [`Role`]. Serialization walks the list once and produces a single
//! fragment whose `$N` placeholders line up with its bind list.
//!
//! Rendering rules for a member's binds:
//!
//! - no binds: the text as is (`"a" = "b"`, `"x" IS NULL`); an `IN` / `NOT IN`
//!   with no binds is dropped together with its conjunction
//! - one bind: `$N`, or the literal itself for a pre-quoted string; `IN` keeps
//!   its parentheses
//! - `BETWEEN`: exactly two binds, `$N AND $N+1`
//! - otherwise a parenthesized list, literals inlined position by position
//!
//! Top level AND members come first; top level OR members are grouped
//! behind them as `AND (... OR ...)`. Members inside brackets keep their
//! declared order.

use crate::error::BuildError;
use crate::raw::RawFragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    fn as_sql(self) -> &'static str {
        match self {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        }
    }
}

/// How a fragment takes part in its clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    AndMember,
    OrMember,
    /// Opens a group that is joined to what precedes it with the conjunction.
    BracketOpen(Conjunction),
    BracketClose,
    /// Inserted verbatim (AND-joined); its text numbers its own placeholders.
    RawPassthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredicateFragment {
    pub role: Role,
    pub fragment: RawFragment,
}

impl PredicateFragment {
    pub fn member(fragment: RawFragment) -> Self {
        Self {
            role: Role::AndMember,
            fragment,
        }
    }

    pub fn raw(fragment: RawFragment) -> Self {
        Self {
            role: Role::RawPassthrough,
            fragment,
        }
    }
}

/// Ordered fragments of one boolean clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateSet {
    items: Vec<PredicateFragment>,
    depth: usize,
    error: Option<BuildError>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// First misuse recorded while the set was built.
    pub fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }

    pub fn and(&mut self, fragment: RawFragment) {
        self.push(Role::AndMember, fragment);
    }

    pub fn or(&mut self, fragment: RawFragment) {
        self.push(Role::OrMember, fragment);
    }

    pub fn raw(&mut self, fragment: RawFragment) {
        self.push(Role::RawPassthrough, fragment);
    }

    pub fn open_bracket(&mut self, conjunction: Conjunction) {
        self.push(Role::BracketOpen(conjunction), RawFragment::default());
    }

    pub fn close_bracket(&mut self) {
        self.push(Role::BracketClose, RawFragment::default());
    }

    /// Append a fragment. Misuse is recorded and reported by [`serialize`](Self::serialize).
    pub fn push(&mut self, role: Role, fragment: RawFragment) {
        match role {
            Role::BracketOpen(_) => self.depth += 1,
            Role::BracketClose => {
                if self.depth == 0 {
                    self.fail(BuildError::UnbalancedBracket);
                    return;
                }
                self.depth -= 1;
            }
            Role::AndMember | Role::OrMember => {
                if Shape::of(&fragment.text) == Shape::Range && fragment.binds.len() != 2 {
                    self.fail(BuildError::BetweenArity(fragment.binds.len()));
                    return;
                }
            }
            Role::RawPassthrough => {}
        }
        self.items.push(PredicateFragment { role, fragment });
    }

    fn fail(&mut self, err: BuildError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Render the clause body (no keyword) with placeholders starting after `offset`.
    ///
    /// Empty text means the owning clause must be left out.
    pub fn serialize(&self, offset: usize) -> Result<RawFragment, BuildError> {
        self.check()?;
        let nodes = build_tree(&self.items)?;

        let (ors, ands): (Vec<&Node<'_>>, Vec<&Node<'_>>) = nodes
            .iter()
            .filter(|n| !n.is_omitted())
            .partition(|n| n.conjunction() == Conjunction::Or);

        let mut out = RawFragment::default();
        match (ands.is_empty(), ors.is_empty()) {
            (false, false) => {
                write_joined(&mut out, offset, &ands, Some(Conjunction::And))?;
                out.text.push_str(" AND (");
                write_joined(&mut out, offset, &ors, Some(Conjunction::Or))?;
                out.text.push(')');
            }
            (false, true) => write_joined(&mut out, offset, &ands, Some(Conjunction::And))?,
            (true, false) => write_joined(&mut out, offset, &ors, Some(Conjunction::Or))?,
            (true, true) => {}
        }
        Ok(out)
    }

    /// Report recorded misuse and unbalanced brackets without rendering.
    pub fn check(&self) -> Result<(), BuildError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.depth > 0 {
            return Err(BuildError::UnclosedBracket(self.depth));
        }
        Ok(())
    }
}

/// Render assignments (`"col" = $N`) joined by `, `, numbered after `offset`.
///
/// Members follow the usual bind rules; raw passthrough items keep their text.
pub(crate) fn render_assignments(
    items: &[PredicateFragment],
    offset: usize,
) -> Result<RawFragment, BuildError> {
    let mut out = RawFragment::default();
    for item in items {
        let node = Node::Leaf(item.role, &item.fragment);
        if node.is_omitted() {
            continue;
        }
        if !out.text.is_empty() {
            out.text.push_str(", ");
        }
        node.write(&mut out, offset)?;
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar,
    List,
    Range,
}

impl Shape {
    /// Classified by the operator the fragment text ends with.
    fn of(text: &str) -> Shape {
        let op = text.trim_end().to_ascii_uppercase();
        if op.ends_with(" BETWEEN") {
            Shape::Range
        } else if op.ends_with(" IN") {
            Shape::List
        } else {
            Shape::Scalar
        }
    }
}

enum Node<'a> {
    Leaf(Role, &'a RawFragment),
    Group(Conjunction, Vec<Node<'a>>),
}

impl Node<'_> {
    fn conjunction(&self) -> Conjunction {
        match self {
            Node::Leaf(Role::OrMember, _) => Conjunction::Or,
            Node::Group(conjunction, _) => *conjunction,
            Node::Leaf(..) => Conjunction::And,
        }
    }

    /// Dropped members: empty raw text, `IN` / `NOT IN` without values,
    /// groups with nothing left inside.
    fn is_omitted(&self) -> bool {
        match self {
            Node::Leaf(Role::RawPassthrough, fragment) => fragment.text.is_empty(),
            Node::Leaf(_, fragment) => {
                fragment.binds.is_empty() && Shape::of(&fragment.text) == Shape::List
            }
            Node::Group(_, children) => children.iter().all(Node::is_omitted),
        }
    }

    /// Append this node to `out`; `$N` continues after `offset` plus `out`'s binds.
    fn write(&self, out: &mut RawFragment, offset: usize) -> Result<(), BuildError> {
        match self {
            Node::Leaf(Role::RawPassthrough, fragment) => {
                out.push_embedded_after(offset, fragment);
                Ok(())
            }
            Node::Leaf(_, fragment) => write_member(out, offset, fragment),
            Node::Group(_, children) => {
                let children: Vec<&Node<'_>> = children.iter().collect();
                out.text.push('(');
                write_joined(out, offset, &children, None)?;
                out.text.push(')');
                Ok(())
            }
        }
    }
}

fn build_tree(items: &[PredicateFragment]) -> Result<Vec<Node<'_>>, BuildError> {
    let mut stack: Vec<(Conjunction, Vec<Node<'_>>)> = Vec::new();
    let mut current: Vec<Node<'_>> = Vec::new();

    for item in items {
        match item.role {
            Role::BracketOpen(conjunction) => {
                stack.push((conjunction, std::mem::take(&mut current)));
            }
            Role::BracketClose => {
                let (conjunction, parent) = stack.pop().ok_or(BuildError::UnbalancedBracket)?;
                let children = std::mem::replace(&mut current, parent);
                current.push(Node::Group(conjunction, children));
            }
            role => current.push(Node::Leaf(role, &item.fragment)),
        }
    }

    if !stack.is_empty() {
        return Err(BuildError::UnclosedBracket(stack.len()));
    }
    Ok(current)
}

/// Write the non-omitted nodes; `joiner` forces one conjunction, `None` uses each node's own.
fn write_joined(
    out: &mut RawFragment,
    offset: usize,
    nodes: &[&Node<'_>],
    joiner: Option<Conjunction>,
) -> Result<(), BuildError> {
    let mut first = true;
    for node in nodes.iter().filter(|n| !n.is_omitted()) {
        if !first {
            out.text
                .push_str(joiner.unwrap_or_else(|| node.conjunction()).as_sql());
        }
        node.write(out, offset)?;
        first = false;
    }
    Ok(())
}

/// Write one member: its text, then its binds in the shape its operator needs.
fn write_member(
    out: &mut RawFragment,
    offset: usize,
    fragment: &RawFragment,
) -> Result<(), BuildError> {
    let shape = Shape::of(&fragment.text);
    let cast = fragment.cast.as_deref();
    out.text.push_str(&fragment.text);

    match (shape, fragment.binds.as_slice()) {
        (_, []) => {}
        (Shape::Range, [low, high]) => {
            out.push_value_after(offset, low, cast);
            out.text.push_str(" AND ");
            out.push_value_after(offset, high, cast);
        }
        (Shape::Range, binds) => return Err(BuildError::BetweenArity(binds.len())),
        (Shape::Scalar, [one]) => out.push_value_after(offset, one, cast),
        (_, binds) => {
            out.text.push('(');
            for (i, bind) in binds.iter().enumerate() {
                if i > 0 {
                    out.text.push_str(", ");
                }
                out.push_value_after(offset, bind, cast);
            }
            out.text.push(')');
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::Ident;
    use crate::value::bind;

    fn col(name: &str) -> Ident {
        Ident::column(name)
    }

    fn and(set: &mut PredicateSet, c: crate::Condition) {
        set.and(c.to_fragment(None));
    }

    fn or(set: &mut PredicateSet, c: crate::Condition) {
        set.or(c.to_fragment(None));
    }

    #[test]
    fn test_empty_set_renders_nothing() {
        let set = PredicateSet::new();
        let out = set.serialize(0).unwrap();
        assert!(out.text.is_empty());
        assert!(out.binds.is_empty());
    }

    #[test]
    fn test_and_members() {
        let mut set = PredicateSet::new();
        and(&mut set, col("a").eq(1_i64));
        and(&mut set, col("b").gt(2_i64));
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""a" = $1 AND "b" > $2"#);
        assert_eq!(out.binds, vec![bind(1_i64), bind(2_i64)]);
    }

    #[test]
    fn test_empty_in_is_dropped() {
        let mut set = PredicateSet::new();
        and(&mut set, col("id").in_list(Vec::<i64>::new()));
        and(&mut set, col("other").eq(5_i64));
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""other" = $1"#);
        assert_eq!(out.binds, vec![bind(5_i64)]);
    }

    #[test]
    fn test_empty_not_in_between_members() {
        let mut set = PredicateSet::new();
        and(&mut set, col("a").eq(1_i64));
        and(&mut set, col("id").not_in(Vec::<i64>::new()));
        and(&mut set, col("b").eq(2_i64));
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""a" = $1 AND "b" = $2"#);
    }

    #[test]
    fn test_bracket_has_no_leading_conjunction() {
        let mut set = PredicateSet::new();
        set.open_bracket(Conjunction::And);
        and(&mut set, col("a").eq(1_i64));
        and(&mut set, col("b").eq(2_i64));
        set.close_bracket();
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#"("a" = $1 AND "b" = $2)"#);
    }

    #[test]
    fn test_bracket_after_member() {
        let mut set = PredicateSet::new();
        and(&mut set, col("a").eq(1_i64));
        set.open_bracket(Conjunction::And);
        and(&mut set, col("b").eq(2_i64));
        or(&mut set, col("c").eq(3_i64));
        set.close_bracket();
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""a" = $1 AND ("b" = $2 OR "c" = $3)"#);
        assert_eq!(out.binds.len(), 3);
    }

    #[test]
    fn test_or_members_grouped_after_and() {
        let mut set = PredicateSet::new();
        or(&mut set, col("x").eq(1_i64));
        and(&mut set, col("a").eq(2_i64));
        or(&mut set, col("y").eq(3_i64));
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""a" = $1 AND ("x" = $2 OR "y" = $3)"#);
        assert_eq!(out.binds, vec![bind(2_i64), bind(1_i64), bind(3_i64)]);
    }

    #[test]
    fn test_only_or_members() {
        let mut set = PredicateSet::new();
        or(&mut set, col("x").eq(1_i64));
        or(&mut set, col("y").eq(2_i64));
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""x" = $1 OR "y" = $2"#);
    }

    #[test]
    fn test_between_renders_two_placeholders() {
        let mut set = PredicateSet::new();
        and(&mut set, col("col").range([1_i64, 10]).unwrap());
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""col" BETWEEN $1 AND $2"#);
        assert_eq!(out.binds, vec![bind(1_i64), bind(10_i64)]);
    }

    #[test]
    fn test_between_wrong_arity_is_rejected() {
        let mut set = PredicateSet::new();
        set.and(RawFragment::with_binds(r#""col" BETWEEN "#, [bind(1_i64)]));
        assert_eq!(set.error(), Some(&BuildError::BetweenArity(1)));
        assert_eq!(set.serialize(0), Err(BuildError::BetweenArity(1)));
    }

    #[test]
    fn test_in_list_rendering() {
        let mut set = PredicateSet::new();
        and(&mut set, col("id").in_list([1_i64, 2, 3]));
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""id" IN ($1, $2, $3)"#);

        let mut set = PredicateSet::new();
        and(&mut set, col("id").in_list([7_i64]));
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""id" IN ($1)"#);
    }

    #[test]
    fn test_all_literal_in_list_collapses() {
        let mut set = PredicateSet::new();
        and(&mut set, col("kind").in_list(["'gas'", "'rock'"]));
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""kind" IN ('gas', 'rock')"#);
        assert!(out.binds.is_empty());
    }

    #[test]
    fn test_mixed_literal_in_list_keeps_positions() {
        let mut set = PredicateSet::new();
        and(&mut set, col("kind").in_list(["'gas'", "rock", "'ice'", "dust"]));
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""kind" IN ('gas', $1, 'ice', $2)"#);
        assert_eq!(out.binds, vec![bind("rock"), bind("dust")]);
    }

    #[test]
    fn test_literal_scalar_is_inlined() {
        let mut set = PredicateSet::new();
        and(&mut set, col("status").eq("'active'::status"));
        and(&mut set, col("kind").eq("'gas'"));
        and(&mut set, col("id").eq(4_i64));
        let out = set.serialize(0).unwrap();
        assert_eq!(
            out.text,
            r#""status" = $1 AND "kind" = 'gas' AND "id" = $2"#
        );
        assert_eq!(out.binds.len(), 2);
    }

    #[test]
    fn test_casts() {
        let mut set = PredicateSet::new();
        and(&mut set, col("id").eq("x").cast("uuid"));
        and(&mut set, col("n").between(1_i64, 2_i64).cast("int4"));
        let out = set.serialize(0).unwrap();
        assert_eq!(
            out.text,
            r#""id" = $1::uuid AND "n" BETWEEN $2::int4 AND $3::int4"#
        );
    }

    #[test]
    fn test_offset_continues_numbering() {
        let mut set = PredicateSet::new();
        and(&mut set, col("a").eq(1_i64));
        or(&mut set, col("b").eq(2_i64));
        or(&mut set, col("c").eq(3_i64));
        let out = set.serialize(4).unwrap();
        assert_eq!(out.text, r#""a" = $5 AND ("b" = $6 OR "c" = $7)"#);
        assert_eq!(out.binds.len(), 3);
    }

    #[test]
    fn test_raw_passthrough_renumbered() {
        let mut set = PredicateSet::new();
        and(&mut set, col("a").eq(1_i64));
        set.raw(RawFragment::with_binds(
            "lower(\"name\") = $1 OR \"nick\" = $2",
            [bind("x"), bind("y")],
        ));
        let out = set.serialize(0).unwrap();
        assert_eq!(
            out.text,
            r#""a" = $1 AND lower("name") = $2 OR "nick" = $3"#
        );
        assert_eq!(out.binds, vec![bind(1_i64), bind("x"), bind("y")]);
    }

    #[test]
    fn test_unbalanced_brackets() {
        let mut set = PredicateSet::new();
        set.close_bracket();
        assert_eq!(set.serialize(0), Err(BuildError::UnbalancedBracket));

        let mut set = PredicateSet::new();
        set.open_bracket(Conjunction::And);
        and(&mut set, col("a").eq(1_i64));
        assert_eq!(set.serialize(0), Err(BuildError::UnclosedBracket(1)));
    }

    #[test]
    fn test_bracket_with_only_dropped_members_is_dropped() {
        let mut set = PredicateSet::new();
        and(&mut set, col("a").eq(1_i64));
        set.open_bracket(Conjunction::And);
        and(&mut set, col("id").in_list(Vec::<i64>::new()));
        set.close_bracket();
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""a" = $1"#);
    }

    #[test]
    fn test_or_bracket_at_top_level() {
        let mut set = PredicateSet::new();
        and(&mut set, col("a").eq(1_i64));
        set.open_bracket(Conjunction::Or);
        and(&mut set, col("b").eq(2_i64));
        and(&mut set, col("c").eq(3_i64));
        set.close_bracket();
        let out = set.serialize(0).unwrap();
        assert_eq!(out.text, r#""a" = $1 AND (("b" = $2 AND "c" = $3))"#);
    }

    #[test]
    fn test_assignments() {
        let items = vec![
            PredicateFragment::member(col("name").eq("X").to_fragment(None)),
            PredicateFragment::member(
                col("count").eq_col(&Ident::column("count").of("excluded")).to_fragment(None),
            ),
            PredicateFragment::raw(RawFragment::with_binds(
                r#""score" = greatest($1, "score")"#,
                [bind(3_i64)],
            )),
        ];
        let out = render_assignments(&items, 0).unwrap();
        assert_eq!(
            out.text,
            r#""name" = $1, "count" = "excluded"."count", "score" = greatest($2, "score")"#
        );
        assert_eq!(out.binds, vec![bind("X"), bind(3_i64)]);
    }
}
