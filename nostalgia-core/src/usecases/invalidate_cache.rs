use super::prelude::*;

pub fn invalidate_location_detail<C>(cache: &C, id: PinId) -> usize
where
    C: QueryCache + ?Sized,
{
    invalidate(cache, QueryFilter::Exact(QueryKey::LocationDetail(id)))
}

pub fn invalidate_all_location_details<C>(cache: &C) -> usize
where
    C: QueryCache + ?Sized,
{
    invalidate(cache, QueryFilter::Kind(QueryKind::LocationDetail))
}

pub fn invalidate_bbox_queries<C>(cache: &C) -> usize
where
    C: QueryCache + ?Sized,
{
    invalidate(cache, QueryFilter::Kind(QueryKind::Pins))
}

pub fn invalidate_all<C>(cache: &C) -> usize
where
    C: QueryCache + ?Sized,
{
    invalidate(cache, QueryFilter::All)
}

fn invalidate<C>(cache: &C, filter: QueryFilter) -> usize
where
    C: QueryCache + ?Sized,
{
    let count = cache.invalidate(&filter);
    log::debug!("Invalidated {count} cached queries matching {filter:?}");
    count
}
